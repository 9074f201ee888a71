//! Raw JSON shapes exchanged with the native engine.
//!
//! Every reply payload carries an `error` field where an empty string means
//! success; non-empty means the engine completed the call but reports a
//! failure. Request shapes use camelCase field names, matching what the
//! engine parses.

use serde::{Deserialize, Serialize};

/// Accessor for the `error` field every engine reply carries.
pub trait EnginePayload {
    fn error(&self) -> &str;
}

/// Reply to `open-connection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectPayload {
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub error: String,
}

/// Reply to `close-connection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosePayload {
    #[serde(default)]
    pub error: String,
}

/// Reply to `execute-query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub metadata: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<String>>,
}

impl EnginePayload for ConnectPayload {
    fn error(&self) -> &str {
        &self.error
    }
}

impl EnginePayload for ClosePayload {
    fn error(&self) -> &str {
        &self.error
    }
}

impl EnginePayload for QueryPayload {
    fn error(&self) -> &str {
        &self.error
    }
}

/// Request body for `close-connection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseRequest {
    pub conn_handle: String,
}

/// Request body for `execute-query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub conn_handle: String,
    pub query: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}
