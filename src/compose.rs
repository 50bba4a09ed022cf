//! Vertical stacking of rasters onto a single canvas.

use image::imageops;
use image::{Rgba, RgbaImage};

use crate::error::BannerError;

/// How the parts of an output image are arranged, top to bottom.
#[derive(Debug, Clone, Copy)]
pub enum Layout<'a> {
    /// The same image above and below the banner.
    Sandwich {
        /// Normalized source image.
        image: &'a RgbaImage,
        /// Rendered banner.
        banner: &'a RgbaImage,
    },
    /// Two different images around the banner.
    Split {
        /// Normalized top image.
        top: &'a RgbaImage,
        /// Rendered banner.
        banner: &'a RgbaImage,
        /// Normalized bottom image.
        bottom: &'a RgbaImage,
    },
}

impl<'a> Layout<'a> {
    /// Parts in stacking order.
    #[must_use]
    pub fn parts(&self) -> [&'a RgbaImage; 3] {
        match *self {
            Self::Sandwich { image, banner } => [image, banner, image],
            Self::Split { top, banner, bottom } => [top, banner, bottom],
        }
    }
}

/// Largest raster a request may allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLimits {
    /// Largest width or height.
    pub max_dimension: u32,
    /// Largest `width * height`.
    pub max_pixels: u64,
}

impl CanvasLimits {
    /// Reject `width × height` before anything that size is allocated.
    ///
    /// # Errors
    ///
    /// Returns [`BannerError::Geometry`] naming `what` if either side exceeds
    /// `max_dimension` or the area exceeds `max_pixels`.
    pub fn check(self, what: &str, width: u32, height: u32) -> Result<(), BannerError> {
        let pixels = u64::from(width) * u64::from(height);
        if width > self.max_dimension || height > self.max_dimension || pixels > self.max_pixels {
            return Err(BannerError::Geometry(format!(
                "{what} would be {width}x{height}, limit is {max}x{max} and {pixels_max} pixels",
                max = self.max_dimension,
                pixels_max = self.max_pixels,
            )));
        }
        Ok(())
    }
}

/// Where one part lands on the canvas.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    /// The part's pixels.
    pub raster: &'a RgbaImage,
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
}

/// A validated arrangement: every part inside the canvas, stacked with no
/// gaps or overlaps, canvas height equal to the sum of part heights.
#[derive(Debug, Clone)]
pub struct CompositionPlan<'a> {
    width: u32,
    height: u32,
    placements: Vec<Placement<'a>>,
}

impl<'a> CompositionPlan<'a> {
    /// Stack `parts` flush-left on a canvas `width` wide.
    ///
    /// # Errors
    ///
    /// Returns [`BannerError::Geometry`] if a part is wider than the canvas,
    /// the canvas would be empty, or it exceeds `limits`.
    pub fn stack(
        width: u32,
        parts: &[&'a RgbaImage],
        limits: CanvasLimits,
    ) -> Result<Self, BannerError> {
        if width == 0 {
            return Err(BannerError::Geometry("canvas width must be positive".into()));
        }
        let mut placements = Vec::with_capacity(parts.len());
        let mut y: u32 = 0;
        for (index, &raster) in parts.iter().enumerate() {
            if raster.width() > width {
                return Err(BannerError::Geometry(format!(
                    "part {index} is {} wide, canvas is {width}",
                    raster.width()
                )));
            }
            placements.push(Placement { raster, x: 0, y });
            y = y.checked_add(raster.height()).ok_or_else(|| {
                BannerError::Geometry("stacked height overflows".to_string())
            })?;
        }
        if y == 0 {
            return Err(BannerError::Geometry("canvas height must be positive".into()));
        }
        limits.check("canvas", width, y)?;
        Ok(Self { width, height: y, placements })
    }

    /// Plan a [`Layout`].
    ///
    /// # Errors
    ///
    /// See [`CompositionPlan::stack`].
    pub fn for_layout(
        width: u32,
        layout: &Layout<'a>,
        limits: CanvasLimits,
    ) -> Result<Self, BannerError> {
        Self::stack(width, &layout.parts(), limits)
    }

    /// Canvas width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Placements in drawing order.
    #[must_use]
    pub fn placements(&self) -> &[Placement<'a>] {
        &self.placements
    }
}

/// Draw every placement over a canvas filled with `fill`.
#[must_use]
pub fn flatten(plan: &CompositionPlan<'_>, fill: Rgba<u8>) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(plan.width(), plan.height(), fill);
    for placement in plan.placements() {
        imageops::overlay(
            &mut canvas,
            placement.raster,
            i64::from(placement.x),
            i64::from(placement.y),
        );
    }
    canvas
}
