//! Adapters that pass calls through and write each one to a cassette.

pub mod image_source;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;

/// Store `result` as `{"Ok": ..}` or `{"Err": "message"}`.
///
/// A value that cannot be serialized is logged and left out of the cassette.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let output = match result {
        Ok(value) => serde_json::to_value(value).map(|v| serde_json::json!({ "Ok": v })),
        Err(e) => Ok(serde_json::json!({ "Err": e.to_string() })),
    };
    match (serde_json::to_value(input), output) {
        (Ok(input), Ok(output)) => {
            recorder.lock().unwrap_or_else(PoisonError::into_inner).record(port, method, input, output);
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(port, method, error = %e, "interaction not recorded");
        }
    }
}
