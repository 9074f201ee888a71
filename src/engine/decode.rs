//! Result payload decoding.

use serde::de::DeserializeOwned;

use super::payload::EnginePayload;
use super::{EngineError, NativeEngine, RawPayload, NULL_PAYLOAD};

/// Frees the payload when dropped, so every exit path releases it exactly
/// once.
struct PayloadGuard<'a> {
    engine: &'a mut dyn NativeEngine,
    payload: RawPayload,
}

impl Drop for PayloadGuard<'_> {
    fn drop(&mut self) {
        self.engine.free_result(self.payload);
    }
}

/// Decode a raw engine payload into a typed reply.
///
/// The payload's native memory is released before this returns, on the
/// success path and on every failure path. A null payload means the engine
/// could not allocate a response; a reply whose `error` field is non-empty
/// becomes [`EngineError::Native`] carrying the engine's message verbatim.
pub fn decode_payload<T>(
    engine: &mut dyn NativeEngine,
    payload: RawPayload,
) -> Result<T, EngineError>
where
    T: DeserializeOwned + EnginePayload,
{
    if payload == NULL_PAYLOAD {
        return Err(EngineError::Allocation);
    }
    let bytes = {
        let guard = PayloadGuard { engine, payload };
        guard.engine.read_result(payload)
    };
    // The buffer is a C string; decode up to the first NUL.
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let reply: T =
        serde_json::from_slice(&bytes[..end]).map_err(EngineError::MalformedPayload)?;
    if reply.error().is_empty() {
        Ok(reply)
    } else {
        Err(EngineError::Native(reply.error().to_string()))
    }
}
