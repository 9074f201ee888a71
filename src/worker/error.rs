//! Worker-specific error types.

use thiserror::Error;

use crate::engine::EngineError;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors that can occur while driving the worker.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The native engine boundary reported a failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No connection is currently open.
    #[error("connection not established")]
    NotConnected,

    /// No connect options were ever supplied, so there is nothing to
    /// reconnect with.
    #[error("no connect options configured")]
    NotConfigured,

    /// An operation that needs the engine arrived before `LoadLibrary`.
    #[error("engine library not loaded")]
    EngineNotLoaded,

    /// A request message matched no known variant, or more than one.
    #[error("invalid worker request: {0}")]
    InvalidRequest(String),

    /// A channel message could not be encoded or decoded.
    #[error("malformed worker message: {0}")]
    Protocol(#[source] serde_json::Error),

    /// The worker has shut down and no longer accepts requests.
    #[error("worker is terminated")]
    Terminated,

    /// The reply channel closed before a response arrived.
    #[error("response channel closed unexpectedly")]
    ChannelClosed,

    /// An error rendered by a remote worker, message preserved verbatim.
    #[error("{0}")]
    Remote(String),
}

impl WorkerError {
    /// True for errors caused by calling an operation before its
    /// prerequisite state was reached.
    pub fn is_protocol_misuse(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::NotConfigured | Self::EngineNotLoaded
        )
    }

    /// True once the worker no longer accepts requests.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::ChannelClosed)
    }
}
