//! Connection session state.

use tracing::warn;

use crate::engine::payload::{ClosePayload, CloseRequest, ConnectPayload};
use crate::engine::{decode_payload, NativeEngine};
use crate::worker::protocol::{ConnectOptions, ConnectionHandle};
use crate::worker::{WorkerError, WorkerResult};

/// The currently held (or absent) database connection and its originating
/// options.
///
/// At most one handle is live at a time. The options of the last successful
/// connect are kept so the session can re-establish the connection on demand.
/// The session never owns the engine; the worker passes it in, keeping both
/// under a single owner.
#[derive(Default)]
pub struct ConnectionSession {
    options: Option<ConnectOptions>,
    handle: Option<ConnectionHandle>,
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Open a connection with the given options, storing them for later
    /// reconnects.
    ///
    /// An already-open handle is closed first, best-effort: a close failure
    /// on a possibly-broken connection must not block reconnection. On
    /// failure the session stays disconnected and the options are not
    /// stored.
    pub fn connect(
        &mut self,
        engine: &mut dyn NativeEngine,
        options: ConnectOptions,
    ) -> WorkerResult<ConnectionHandle> {
        self.close(engine);
        let request = serde_json::to_vec(&options).map_err(WorkerError::Protocol)?;
        let payload = engine.open_connection(&request);
        let reply: ConnectPayload = decode_payload(engine, payload)?;
        let handle = ConnectionHandle::from(reply.handle);
        self.options = Some(options);
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Re-establish the connection with the previously stored options.
    pub fn reconnect(&mut self, engine: &mut dyn NativeEngine) -> WorkerResult<ConnectionHandle> {
        let options = self.options.clone().ok_or(WorkerError::NotConfigured)?;
        self.connect(engine, options)
    }

    /// The live handle, or `NotConnected`.
    pub fn current_handle(&self) -> WorkerResult<&ConnectionHandle> {
        self.handle.as_ref().ok_or(WorkerError::NotConnected)
    }

    /// Close the current connection, if any. Close failures are logged and
    /// suppressed; the session always ends up disconnected.
    pub fn close(&mut self, engine: &mut dyn NativeEngine) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let request = CloseRequest {
            conn_handle: handle.as_str().to_string(),
        };
        let encoded = match serde_json::to_vec(&request) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(handle = %handle, error = %e, "failed to encode close request");
                return;
            }
        };
        let payload = engine.close_connection(&encoded);
        if let Err(e) = decode_payload::<ClosePayload>(engine, payload) {
            warn!(handle = %handle, error = %e, "failed to close connection");
        }
    }
}
