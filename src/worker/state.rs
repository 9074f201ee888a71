//! The worker state machine.

use std::path::Path;

use tracing::{debug, warn};

use crate::engine::payload::{QueryPayload, QueryRequest};
use crate::engine::{decode_payload, EngineLoader, NativeEngine};
use crate::session::ConnectionSession;

use super::error::{WorkerError, WorkerResult};
use super::protocol::{
    ConnectOptions, ConnectionHandle, RequestEnvelope, ResponseEnvelope, ResultSet, WorkerReply,
    WorkerRequest, WorkerResponse,
};

/// Lifecycle phase of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No engine library loaded yet.
    Uninitialized,
    /// Engine loaded; the session may or may not hold a connection.
    Idle,
    /// Shut down; no further requests are processed.
    Terminated,
}

/// Single-owner worker: one engine instance, one connection, requests
/// processed strictly one at a time.
///
/// This is the synchronous core. [`WorkerClient`](super::WorkerClient)
/// drives it from a dedicated thread; it can equally be driven directly for
/// in-process use, either through the typed methods or through
/// [`Worker::handle_message`] with raw JSON.
///
/// An operational error never terminates the worker; only [`Worker::shutdown`]
/// does. Errors are returned to the caller of the failing operation and the
/// worker stays responsive to the next request.
pub struct Worker<L> {
    loader: L,
    engine: Option<Box<dyn NativeEngine>>,
    session: ConnectionSession,
    terminated: bool,
}

impl<L: EngineLoader> Worker<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            engine: None,
            session: ConnectionSession::new(),
            terminated: false,
        }
    }

    pub fn state(&self) -> WorkerState {
        if self.terminated {
            WorkerState::Terminated
        } else if self.engine.is_some() {
            WorkerState::Idle
        } else {
            WorkerState::Uninitialized
        }
    }

    /// Process one request and produce exactly one response.
    pub fn handle(&mut self, request: WorkerRequest) -> WorkerResponse {
        match request {
            WorkerRequest::LoadLibrary(path) => {
                self.load_library(&path).map(|_| WorkerReply::LibraryLoaded)
            }
            WorkerRequest::Connect(options) => self.connect(options).map(WorkerReply::Connected),
            WorkerRequest::Query { query, parameters } => self
                .query(&query, &parameters)
                .map(WorkerReply::QueryExecuted),
            WorkerRequest::Close => self.close().map(|_| WorkerReply::Closed),
            WorkerRequest::Shutdown => self.shutdown().map(|_| WorkerReply::ShutDown),
        }
    }

    /// Process one raw JSON request line and render the JSON response.
    ///
    /// Malformed input yields an error response, never a panic: the worker
    /// must stay responsive to whatever arrives on the channel.
    pub fn handle_message(&mut self, message: &str) -> String {
        let response = self.dispatch_message(message);
        let envelope = ResponseEnvelope::from(response);
        serde_json::to_string(&envelope)
            .unwrap_or_else(|e| format!(r#"{{"error":"failed to encode worker response: {e}"}}"#))
    }

    fn dispatch_message(&mut self, message: &str) -> WorkerResponse {
        let envelope: RequestEnvelope =
            serde_json::from_str(message).map_err(WorkerError::Protocol)?;
        let request = WorkerRequest::try_from(envelope)?;
        self.handle(request)
    }

    /// Load the native engine library.
    ///
    /// Idempotent: a second call with an engine already loaded is a no-op
    /// success. On failure the worker stays uninitialized; a later attempt
    /// with a good path may still succeed.
    pub fn load_library(&mut self, path: &Path) -> WorkerResult<()> {
        self.ensure_live()?;
        if self.engine.is_some() {
            debug!("engine library already loaded");
            return Ok(());
        }
        self.engine = Some(self.loader.load(path)?);
        debug!(path = %path.display(), "engine library loaded");
        Ok(())
    }

    /// Open a connection, replacing any current one.
    pub fn connect(&mut self, options: ConnectOptions) -> WorkerResult<ConnectionHandle> {
        self.ensure_live()?;
        let engine = self
            .engine
            .as_deref_mut()
            .ok_or(WorkerError::EngineNotLoaded)?;
        self.session.connect(engine, options)
    }

    /// Execute a query against the current connection.
    ///
    /// On failure the worker reconnects once and retries the query once; the
    /// retry's outcome is what the caller sees. The first failure is
    /// preserved in the log, so a transient connection drop and a genuinely
    /// bad query can still be told apart after the fact.
    pub fn query(&mut self, query: &str, parameters: &[String]) -> WorkerResult<ResultSet> {
        self.ensure_live()?;
        self.session.current_handle()?;
        match self.execute(query, parameters) {
            Ok(result) => Ok(result),
            Err(first) => {
                warn!(error = %first, "query failed, reconnecting for one retry");
                let engine = self
                    .engine
                    .as_deref_mut()
                    .ok_or(WorkerError::EngineNotLoaded)?;
                self.session.reconnect(engine)?;
                self.execute(query, parameters)
            }
        }
    }

    fn execute(&mut self, query: &str, parameters: &[String]) -> WorkerResult<ResultSet> {
        let handle = self.session.current_handle()?.clone();
        let engine = self
            .engine
            .as_deref_mut()
            .ok_or(WorkerError::EngineNotLoaded)?;
        let request = QueryRequest {
            conn_handle: handle.as_str().to_string(),
            query: query.to_string(),
            parameters: parameters.to_vec(),
        };
        let encoded = serde_json::to_vec(&request).map_err(WorkerError::Protocol)?;
        let payload = engine.execute_query(&encoded);
        let reply: QueryPayload = decode_payload(engine, payload)?;
        Ok(ResultSet::try_from(reply)?)
    }

    /// Close the current connection. The engine stays loaded, close errors
    /// are suppressed and the operation succeeds regardless.
    pub fn close(&mut self) -> WorkerResult<()> {
        self.ensure_live()?;
        if let Some(engine) = self.engine.as_deref_mut() {
            self.session.close(engine);
        }
        Ok(())
    }

    /// Shut down: best-effort close, release the engine, stop accepting
    /// requests.
    pub fn shutdown(&mut self) -> WorkerResult<()> {
        self.ensure_live()?;
        self.release();
        self.terminated = true;
        debug!("worker terminated");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            self.session.close(engine.as_mut());
        }
    }

    fn ensure_live(&self) -> WorkerResult<()> {
        if self.terminated {
            Err(WorkerError::Terminated)
        } else {
            Ok(())
        }
    }
}

impl<L> Drop for Worker<L> {
    /// A worker abandoned without `Shutdown` still closes its connection and
    /// releases the engine.
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            self.session.close(engine.as_mut());
        }
    }
}
