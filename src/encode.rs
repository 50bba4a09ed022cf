//! Encoding a composed canvas to PNG or JPEG bytes.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};

use crate::error::BannerError;
use crate::media::OutputFormat;

/// The final encoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputImage {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Encoding used.
    pub format: OutputFormat,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

impl OutputImage {
    /// `Content-Type` for these bytes.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Encode `canvas` in `format`.
///
/// PNG keeps the alpha channel unless every pixel is opaque. JPEG has no
/// alpha, so any transparency is flattened onto white first.
///
/// # Errors
///
/// Returns [`BannerError::Encode`] if the encoder fails.
pub fn encode(
    canvas: &RgbaImage,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<OutputImage, BannerError> {
    let (width, height) = canvas.dimensions();
    let mut bytes = Vec::new();
    let result = match format {
        OutputFormat::Png if is_opaque(canvas) => PngEncoder::new(&mut bytes).write_image(
            &drop_alpha(canvas),
            width,
            height,
            ExtendedColorType::Rgb8,
        ),
        OutputFormat::Png => PngEncoder::new(&mut bytes).write_image(
            canvas.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut bytes, jpeg_quality)
            .write_image(&flatten_onto_white(canvas), width, height, ExtendedColorType::Rgb8),
    };
    result.map_err(|e| BannerError::Encode(e.to_string()))?;

    tracing::debug!(?format, width, height, bytes = bytes.len(), "encoded output");
    Ok(OutputImage { bytes, format, width, height })
}

fn is_opaque(canvas: &RgbaImage) -> bool {
    canvas.pixels().all(|p| p.0[3] == u8::MAX)
}

fn drop_alpha(canvas: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let [r, g, b, _] = canvas.get_pixel(x, y).0;
        image::Rgb([r, g, b])
    })
}

fn flatten_onto_white(canvas: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        let a = u16::from(a);
        let over_white = |c: u8| -> u8 {
            let blended = (u16::from(c) * a + 255 * (255 - a) + 127) / 255;
            u8::try_from(blended).unwrap_or(u8::MAX)
        };
        image::Rgb([over_white(r), over_white(g), over_white(b)])
    })
}
