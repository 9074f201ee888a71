//! Engine-boundary error types.

use thiserror::Error;

/// Errors surfaced at the native engine boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The native call returned a null result payload.
    #[error("native result allocation failed")]
    Allocation,

    /// The native call completed but reported a failure.
    ///
    /// The message text is preserved verbatim; callers match on substrings
    /// such as a failing identifier name.
    #[error("{0}")]
    Native(String),

    /// The result payload was not valid JSON.
    #[error("malformed result payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// A result row does not line up with the column metadata.
    #[error("result row {row} has {actual} cells, expected {expected}")]
    InvalidResultShape {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The engine library could not be loaded.
    #[error("failed to load engine library: {0}")]
    LoadFailed(String),
}
