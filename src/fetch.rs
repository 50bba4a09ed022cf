//! Fetching, validating and decoding source images.

use image::RgbaImage;

use crate::error::BannerError;
use crate::media::MediaType;
use crate::ports::image_source::{FetchedPayload, ImageSource};

/// A fetched image whose declared type and pixels have been validated.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Where the image came from.
    pub url: String,
    /// Decoded pixels. Both dimensions are positive.
    pub raster: RgbaImage,
}

/// Fetch `url` through `source` and decode it.
///
/// # Errors
///
/// - [`BannerError::Fetch`] on transport failure or a non-2xx status.
/// - [`BannerError::UnsupportedFormat`] if the declared type is not PNG or
///   JPEG; no decode is attempted.
/// - [`BannerError::Decode`] if the bytes do not decode as the declared type.
#[tracing::instrument(skip(source))]
pub async fn fetch_image(source: &dyn ImageSource, url: &str) -> Result<SourceImage, BannerError> {
    let payload = source.fetch(url).await?;
    let media_type = validate_payload(url, &payload)?;
    let raster = decode(url, &payload.body, media_type)?;
    tracing::debug!(
        ?media_type,
        bytes = payload.body.len(),
        width = raster.width(),
        height = raster.height(),
        "decoded source image"
    );
    Ok(SourceImage { url: url.to_string(), raster })
}

/// Fetch two images concurrently. The first failure wins.
///
/// # Errors
///
/// Returns whichever fetch error is observed first.
pub async fn fetch_pair(
    source: &dyn ImageSource,
    first: &str,
    second: &str,
) -> Result<(SourceImage, SourceImage), BannerError> {
    tokio::try_join!(fetch_image(source, first), fetch_image(source, second))
}

fn validate_payload(url: &str, payload: &FetchedPayload) -> Result<MediaType, BannerError> {
    if !payload.is_success() {
        return Err(BannerError::fetch(url, format!("HTTP {}", payload.status)));
    }
    let declared = payload.content_type.as_deref().unwrap_or("");
    MediaType::from_content_type(declared).ok_or_else(|| BannerError::UnsupportedFormat {
        url: url.to_string(),
        content_type: if declared.is_empty() { "<none>".to_string() } else { declared.to_string() },
    })
}

fn decode(url: &str, bytes: &[u8], media_type: MediaType) -> Result<RgbaImage, BannerError> {
    let decoded = image::load_from_memory_with_format(bytes, media_type.image_format())
        .map_err(|e| BannerError::Decode { url: url.to_string(), reason: e.to_string() })?;
    let raster = decoded.to_rgba8();
    if raster.width() == 0 || raster.height() == 0 {
        return Err(BannerError::Decode {
            url: url.to_string(),
            reason: format!("zero dimension {}x{}", raster.width(), raster.height()),
        });
    }
    Ok(raster)
}
