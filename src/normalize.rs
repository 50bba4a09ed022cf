//! Resizing source images to a common width.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::compose::CanvasLimits;
use crate::error::BannerError;

/// Height of a `width0 × height0` image scaled to `width`, preserving aspect
/// ratio: `round(height0 * width / width0)`, halves rounding up.
///
/// # Errors
///
/// Returns [`BannerError::Geometry`] if any input is zero or the result
/// rounds to zero or exceeds `u32`.
pub fn scaled_height(width0: u32, height0: u32, width: u32) -> Result<u32, BannerError> {
    if width0 == 0 || height0 == 0 || width == 0 {
        return Err(BannerError::Geometry(format!(
            "cannot scale {width0}x{height0} to width {width}"
        )));
    }
    let numerator = u64::from(height0) * u64::from(width);
    let height = (2 * numerator + u64::from(width0)) / (2 * u64::from(width0));
    match u32::try_from(height) {
        Ok(0) => Err(BannerError::Geometry(format!(
            "{width0}x{height0} scaled to width {width} has zero height"
        ))),
        Ok(h) => Ok(h),
        Err(_) => Err(BannerError::Geometry(format!(
            "{width0}x{height0} scaled to width {width} is too tall"
        ))),
    }
}

/// Resize `raster` to exactly `width` wide with its aspect ratio preserved.
///
/// # Errors
///
/// Returns [`BannerError::Geometry`] if the scaled height is zero or the
/// result would exceed `limits`. Nothing is allocated in either case.
pub fn normalize(
    raster: &RgbaImage,
    width: u32,
    limits: CanvasLimits,
) -> Result<RgbaImage, BannerError> {
    let height = scaled_height(raster.width(), raster.height(), width)?;
    limits.check("normalized image", width, height)?;
    if raster.dimensions() == (width, height) {
        return Ok(raster.clone());
    }
    tracing::debug!(
        from_width = raster.width(),
        from_height = raster.height(),
        width,
        height,
        "normalizing"
    );
    Ok(imageops::resize(raster, width, height, FilterType::Lanczos3))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: CanvasLimits = CanvasLimits { max_dimension: 16_384, max_pixels: 40_000_000 };

    #[test]
    fn scaled_height_rounds() {
        assert_eq!(scaled_height(2000, 1000, 1000).unwrap(), 500);
        assert_eq!(scaled_height(500, 300, 1000).unwrap(), 600);
        // 333 * 1000 / 999 = 333.33
        assert_eq!(scaled_height(999, 333, 1000).unwrap(), 333);
        // 3 * 1000 / 2000 = 1.5 rounds up
        assert_eq!(scaled_height(2000, 3, 1000).unwrap(), 2);
        assert_eq!(scaled_height(1080, 600, 1080).unwrap(), 600);
    }

    #[test]
    fn zero_height_is_geometry_error() {
        let err = scaled_height(10_000, 1, 1000).unwrap_err();
        assert!(matches!(err, BannerError::Geometry(_)));
        assert!(scaled_height(0, 10, 10).is_err());
    }

    #[test]
    fn normalize_hits_exact_dimensions() {
        let src = RgbaImage::from_pixel(300, 200, image::Rgba([1, 2, 3, 255]));
        let out = normalize(&src, 1000, LIMITS).unwrap();
        assert_eq!(out.dimensions(), (1000, 667));

        let out = normalize(&src, 150, LIMITS).unwrap();
        assert_eq!(out.dimensions(), (150, 100));
    }

    #[test]
    fn same_width_is_identity() {
        let mut src = RgbaImage::new(4, 3);
        src.put_pixel(1, 1, image::Rgba([9, 8, 7, 255]));
        let out = normalize(&src, 4, LIMITS).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn very_tall_source_is_rejected_before_resizing() {
        // 1x100000 scaled to 1080 wide would be 1080x108000000.
        let src = RgbaImage::new(1, 100_000);
        let err = normalize(&src, 1080, LIMITS).unwrap_err();
        assert!(matches!(err, BannerError::Geometry(_)));
        assert!(err.to_string().contains("1080x108000000"));
    }
}
