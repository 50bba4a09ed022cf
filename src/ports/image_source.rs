//! Image source port for retrieving upstream image bytes.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::BannerError;

/// A raw HTTP response for an image URL, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPayload {
    /// HTTP status code.
    pub status: u16,
    /// Declared `Content-Type` header, if any.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Response body.
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
}

impl FetchedPayload {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Boxed future type returned by [`ImageSource::fetch`].
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<FetchedPayload, BannerError>> + Send + 'a>>;

/// Retrieves raw bytes for an image URL.
///
/// Implementations report transport failures as errors and return every
/// completed response, whatever its status.
pub trait ImageSource: Send + Sync {
    /// Issue a GET for `url`.
    fn fetch(&self, url: &str) -> FetchFuture<'_>;
}

/// Serde helper for serializing `Vec<u8>` as base64 strings in cassettes.
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64 string.
    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        serializer.serialize_str(&encoded)
    }

    /// Deserialize base64 string to bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
