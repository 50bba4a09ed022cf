//! On-disk cassette format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded session of port interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cassette {
    /// Human-readable session name.
    pub name: String,
    /// When the session was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Git commit the recording was made from.
    pub commit: String,
    /// Interactions in completion order.
    pub interactions: Vec<Interaction>,
}

/// One call through a port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Completion order within the session.
    pub seq: u64,
    /// Port name, e.g. `image_source`.
    pub port: String,
    /// Method name, e.g. `fetch`.
    pub method: String,
    /// Serialized call arguments.
    pub input: serde_json::Value,
    /// Serialized result, using the `{"Ok": ..}` / `{"Err": ..}` convention.
    pub output: serde_json::Value,
}
