//! Native engine boundary.
//!
//! The MSSQL query engine is an external, unmodified library. It is consumed
//! here as an opaque capability with four operations: open a connection,
//! close a connection, execute a query, and free a result buffer. Every
//! operation takes a JSON-encoded request and returns a [`RawPayload`]
//! pointing at a NUL-terminated JSON reply that must be released exactly
//! once — [`decode_payload`] owns that obligation.
//!
//! Loading an engine from a library path goes through [`EngineLoader`]. The
//! FFI-backed loader lives with the embedding application; this crate only
//! defines the seam (and a scripted double in [`test_utils`]).

mod decode;
mod error;
pub mod payload;
pub mod test_utils;

pub use decode::decode_payload;
pub use error::EngineError;

use std::path::Path;

/// Token identifying a live native result buffer.
pub type RawPayload = usize;

/// The null payload: the engine failed to allocate a result.
pub const NULL_PAYLOAD: RawPayload = 0;

/// The native database engine.
///
/// Implementations are exclusively owned by one worker for their entire
/// lifetime, so methods take `&mut self` and no implementation needs internal
/// locking.
pub trait NativeEngine: Send {
    /// Open a connection. The request is JSON-encoded
    /// [`ConnectOptions`](crate::worker::protocol::ConnectOptions).
    fn open_connection(&mut self, request: &[u8]) -> RawPayload;

    /// Close a connection. The request is a JSON-encoded
    /// [`payload::CloseRequest`].
    fn close_connection(&mut self, request: &[u8]) -> RawPayload;

    /// Execute a query. The request is a JSON-encoded
    /// [`payload::QueryRequest`].
    fn execute_query(&mut self, request: &[u8]) -> RawPayload;

    /// Copy out the NUL-terminated JSON bytes backing a live payload.
    fn read_result(&self, payload: RawPayload) -> Vec<u8>;

    /// Release a live payload. Must be called exactly once per non-null
    /// payload returned by the other operations.
    fn free_result(&mut self, payload: RawPayload);
}

/// Maps a library path to a loaded engine instance.
pub trait EngineLoader: Send {
    fn load(&mut self, path: &Path) -> Result<Box<dyn NativeEngine>, EngineError>;
}
