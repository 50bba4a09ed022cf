//! Unified error type for bannergen.

use thiserror::Error;

/// Errors that can occur while serving a banner request.
#[derive(Debug, Error)]
pub enum BannerError {
    /// Missing or malformed request parameters.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The upstream image could not be retrieved.
    #[error("Fetch failed for {url}: {reason}")]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// What went wrong (network failure or HTTP status).
        reason: String,
    },

    /// The upstream declared a content type other than PNG or JPEG.
    #[error("Unsupported format for {url}: {content_type}")]
    UnsupportedFormat {
        /// The URL that was requested.
        url: String,
        /// The declared content type, or `"<none>"`.
        content_type: String,
    },

    /// The fetched bytes do not decode as the declared format.
    #[error("Decode failed for {url}: {reason}")]
    Decode {
        /// The URL the bytes came from.
        url: String,
        /// Decoder message.
        reason: String,
    },

    /// No usable font for banner text.
    #[error("Font unavailable: {0}")]
    FontLoad(String),

    /// A computed dimension was not positive or a part fell outside the canvas.
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    /// The banner markup could not be rasterized.
    #[error("Render failed: {0}")]
    Render(String),

    /// The composed canvas could not be encoded.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// A worker task failed to complete.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BannerError {
    /// Build a [`BannerError::Fetch`] from any displayable cause.
    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Fetch { url: url.to_string(), reason: reason.to_string() }
    }

    /// HTTP status code a function response should carry for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Short machine-readable kind used in the error envelope and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Fetch { .. } => "fetch",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Decode { .. } => "decode",
            Self::FontLoad(_) => "font_load",
            Self::Geometry(_) => "geometry",
            Self::Render(_) => "render",
            Self::Encode(_) => "encode",
            Self::Internal(_) => "internal",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}
