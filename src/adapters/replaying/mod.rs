//! Adapters that answer calls from a cassette instead of the network.

pub mod image_source;

use std::sync::{Arc, Mutex, PoisonError};

use crate::cassette::replayer::CassetteReplayer;

/// Recorded output for this exact call.
pub(crate) fn next_output(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
    input: &serde_json::Value,
) -> Result<serde_json::Value, String> {
    let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
    guard.next_interaction(port, method, input).map(|i| i.output.clone())
}

/// Turn a recorded `{"Ok": ..}` / `{"Err": ..}` output back into a result.
///
/// A bare value without either wrapper is treated as `Ok`.
pub(crate) fn replay_result<T: serde::de::DeserializeOwned>(
    mut output: serde_json::Value,
) -> Result<T, String> {
    if let Some(err) = output.get("Err") {
        return Err(err.as_str().map_or_else(|| err.to_string(), str::to_string));
    }
    let value = match output.get_mut("Ok").map(serde_json::Value::take) {
        Some(ok) => ok,
        None => output,
    };
    serde_json::from_value(value).map_err(|e| format!("recorded output does not match: {e}"))
}
