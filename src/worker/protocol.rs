//! Protocol types for worker communication.
//!
//! The wire shapes use field presence as the discriminator, mirroring the
//! JSON the original worker consumed: exactly one field of a
//! [`RequestEnvelope`] must be set. In-process callers use the typed
//! [`WorkerRequest`] / [`WorkerReply`] enums and never touch the envelopes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::{WorkerError, WorkerResult};
use crate::engine::payload::QueryPayload;
use crate::engine::EngineError;

/// Options used to establish a database connection.
///
/// Immutable once submitted; reused verbatim on reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub instance: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub trust_cert: bool,
}

/// Opaque token identifying a live native connection.
///
/// Owned by the session; invalidated on close or replaced by a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(String);

impl ConnectionHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConnectionHandle {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered query result: column names plus string-rendered rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names, in select order.
    pub metadata: Vec<String>,
    /// Row values; every row has exactly `metadata.len()` cells.
    #[serde(rename = "data")]
    pub rows: Vec<Vec<String>>,
}

impl TryFrom<QueryPayload> for ResultSet {
    type Error = EngineError;

    fn try_from(payload: QueryPayload) -> Result<Self, EngineError> {
        let expected = payload.metadata.len();
        for (row, cells) in payload.data.iter().enumerate() {
            if cells.len() != expected {
                return Err(EngineError::InvalidResultShape {
                    row,
                    expected,
                    actual: cells.len(),
                });
            }
        }
        Ok(Self {
            metadata: payload.metadata,
            rows: payload.data,
        })
    }
}

/// A single operation submitted to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerRequest {
    LoadLibrary(PathBuf),
    Connect(ConnectOptions),
    Query {
        query: String,
        parameters: Vec<String>,
    },
    Close,
    Shutdown,
}

/// The success payload matching a request kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReply {
    LibraryLoaded,
    Connected(ConnectionHandle),
    QueryExecuted(ResultSet),
    Closed,
    ShutDown,
}

/// A worker response: the matching success payload or a typed failure.
pub type WorkerResponse = WorkerResult<WorkerReply>;

/// Body of the `loadLibrary` request field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLibraryBody {
    pub lib_path: PathBuf,
}

/// Body of the `executeQuery` request field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteQueryBody {
    pub query: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Body for fields that carry no data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyBody {}

/// Wire-level request envelope; exactly one field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_library: Option<LoadLibraryBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_connection: Option<ConnectOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_query: Option<ExecuteQueryBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_connection: Option<EmptyBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<bool>,
}

impl TryFrom<RequestEnvelope> for WorkerRequest {
    type Error = WorkerError;

    fn try_from(envelope: RequestEnvelope) -> Result<Self, WorkerError> {
        let populated = usize::from(envelope.load_library.is_some())
            + usize::from(envelope.open_connection.is_some())
            + usize::from(envelope.execute_query.is_some())
            + usize::from(envelope.close_connection.is_some())
            + usize::from(envelope.shutdown.is_some());
        if populated != 1 {
            return Err(WorkerError::InvalidRequest(format!(
                "expected exactly one request field, found {populated}"
            )));
        }
        if let Some(body) = envelope.load_library {
            return Ok(Self::LoadLibrary(body.lib_path));
        }
        if let Some(options) = envelope.open_connection {
            return Ok(Self::Connect(options));
        }
        if let Some(body) = envelope.execute_query {
            return Ok(Self::Query {
                query: body.query,
                parameters: body.parameters,
            });
        }
        if envelope.close_connection.is_some() {
            return Ok(Self::Close);
        }
        Ok(Self::Shutdown)
    }
}

impl From<WorkerRequest> for RequestEnvelope {
    fn from(request: WorkerRequest) -> Self {
        let mut envelope = Self::default();
        match request {
            WorkerRequest::LoadLibrary(lib_path) => {
                envelope.load_library = Some(LoadLibraryBody { lib_path });
            }
            WorkerRequest::Connect(options) => envelope.open_connection = Some(options),
            WorkerRequest::Query { query, parameters } => {
                envelope.execute_query = Some(ExecuteQueryBody { query, parameters });
            }
            WorkerRequest::Close => envelope.close_connection = Some(EmptyBody {}),
            WorkerRequest::Shutdown => envelope.shutdown = Some(true),
        }
        envelope
    }
}

/// Body of the `openConnection` response field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectReplyBody {
    pub handle: ConnectionHandle,
}

/// Wire-level response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_library: Option<EmptyBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_connection: Option<ConnectReplyBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_query: Option<ResultSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_connection: Option<EmptyBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<EmptyBody>,
}

impl From<WorkerResponse> for ResponseEnvelope {
    fn from(response: WorkerResponse) -> Self {
        let mut envelope = Self::default();
        match response {
            Ok(WorkerReply::LibraryLoaded) => envelope.load_library = Some(EmptyBody {}),
            Ok(WorkerReply::Connected(handle)) => {
                envelope.open_connection = Some(ConnectReplyBody { handle });
            }
            Ok(WorkerReply::QueryExecuted(result)) => envelope.execute_query = Some(result),
            Ok(WorkerReply::Closed) => envelope.close_connection = Some(EmptyBody {}),
            Ok(WorkerReply::ShutDown) => envelope.shutdown = Some(EmptyBody {}),
            Err(err) => envelope.error = Some(err.to_string()),
        }
        envelope
    }
}

impl ResponseEnvelope {
    /// Recover the typed response from a wire envelope.
    pub fn into_response(self) -> WorkerResponse {
        if let Some(message) = self.error {
            return Err(WorkerError::Remote(message));
        }
        if self.load_library.is_some() {
            return Ok(WorkerReply::LibraryLoaded);
        }
        if let Some(body) = self.open_connection {
            return Ok(WorkerReply::Connected(body.handle));
        }
        if let Some(result) = self.execute_query {
            return Ok(WorkerReply::QueryExecuted(result));
        }
        if self.close_connection.is_some() {
            return Ok(WorkerReply::Closed);
        }
        if self.shutdown.is_some() {
            return Ok(WorkerReply::ShutDown);
        }
        Err(WorkerError::InvalidRequest(
            "response matched no known variant".to_string(),
        ))
    }
}
