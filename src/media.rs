//! Accepted input media types and output encodings.

use serde::{Deserialize, Serialize};

/// Raster formats the fetcher accepts from upstream servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
}

impl MediaType {
    /// Classify a declared `Content-Type` header value.
    ///
    /// Matching is a case-insensitive substring test, so parameters such as
    /// `; charset=binary` are tolerated. `image/jpg` is accepted as JPEG.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("image/png") {
            Some(Self::Png)
        } else if lower.contains("image/jpeg") || lower.contains("image/jpg") {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    /// The decoder format for this media type.
    #[must_use]
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Encodings a composed image can be returned in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless, keeps transparency.
    #[default]
    Png,
    /// Lossy, always opaque.
    Jpeg,
}

impl OutputFormat {
    /// Parse a user-facing format name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not `png`, `jpeg` or `jpg`.
    pub fn parse(name: &str) -> Result<Self, String> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            _ => Err(format!("Unsupported format '{name}'. Valid: png, jpeg")),
        }
    }

    /// MIME type for the `Content-Type` header.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// File extension used when saving.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}
