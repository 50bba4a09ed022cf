//! The two image pipelines: fetch, normalize, render, compose, encode.

use std::sync::Arc;

use crate::banner::{render_banner, BannerSpec, FontBook, TextFit};
use crate::compose::{flatten, CompositionPlan, Layout};
use crate::config::RenderSettings;
use crate::encode::{encode, OutputImage};
use crate::error::BannerError;
use crate::fetch::{fetch_image, fetch_pair, SourceImage};
use crate::normalize::normalize;
use crate::params::{GenerateParams, MergeParams};
use crate::ports::ImageSource;

/// Shared, read-only resources the pipelines draw on.
pub struct Renderer {
    /// Font faces for banner text.
    pub fonts: FontBook,
    /// Validated layout settings.
    pub settings: RenderSettings,
}

impl Renderer {
    fn text_fit(&self) -> TextFit {
        TextFit {
            glyph_width_factor: self.settings.glyph_width_factor,
            max_width_ratio: self.settings.max_width_ratio,
        }
    }
}

/// `generate`: one image, a banner, the same image again.
///
/// # Errors
///
/// Propagates the first stage failure.
#[tracing::instrument(skip_all, fields(url = %params.image_url))]
pub async fn generate(
    source: &dyn ImageSource,
    renderer: &Arc<Renderer>,
    params: GenerateParams,
) -> Result<OutputImage, BannerError> {
    let image = fetch_image(source, &params.image_url).await?;
    let renderer = Arc::clone(renderer);
    run_blocking(move || compose_generate(&renderer, &image, &params)).await
}

/// `merge`: top image, a fixed-height bar, bottom image.
///
/// # Errors
///
/// Propagates the first stage failure.
#[tracing::instrument(skip_all, fields(top = %params.top_url, bottom = %params.bottom_url))]
pub async fn merge(
    source: &dyn ImageSource,
    renderer: &Arc<Renderer>,
    params: MergeParams,
) -> Result<OutputImage, BannerError> {
    let (top, bottom) = fetch_pair(source, &params.top_url, &params.bottom_url).await?;
    let renderer = Arc::clone(renderer);
    run_blocking(move || compose_merge(&renderer, &top, &bottom, &params)).await
}

async fn run_blocking<F>(work: F) -> Result<OutputImage, BannerError>
where
    F: FnOnce() -> Result<OutputImage, BannerError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BannerError::Internal(format!("render task failed: {e}")))?
}

/// Synchronous part of `generate`.
///
/// # Errors
///
/// Returns the first normalize, render, compose or encode failure.
pub fn compose_generate(
    renderer: &Renderer,
    source: &SourceImage,
    params: &GenerateParams,
) -> Result<OutputImage, BannerError> {
    let s = &renderer.settings;
    let image = normalize(&source.raster, s.generate_width, s.limits)?;
    let (width, height) = image.dimensions();

    let banner_height = scaled(height, s.banner_ratio);
    if banner_height == 0 {
        return Err(BannerError::Geometry(format!(
            "{} is too short for a banner at height {height}",
            source.url
        )));
    }
    #[allow(clippy::cast_precision_loss)]
    let font_px = (banner_height as f32 * s.font_ratio).round();

    let banner = render_banner(
        &BannerSpec {
            width,
            height: banner_height,
            text: &params.title,
            background: params.banner_color.unwrap_or(s.generate_background),
            font_px,
            font_weight: s.font_weight,
        },
        renderer.text_fit(),
        &renderer.fonts,
    )?;

    let plan = CompositionPlan::for_layout(
        width,
        &Layout::Sandwich { image: &image, banner: &banner },
        s.limits,
    )?;
    tracing::debug!(width, height = plan.height(), banner_height, "sandwich planned");
    let canvas = flatten(&plan, s.generate_canvas.rgba());
    encode(&canvas, params.format.unwrap_or(s.generate_format), s.jpeg_quality)
}

/// Synchronous part of `merge`.
///
/// # Errors
///
/// Returns the first normalize, render, compose or encode failure.
pub fn compose_merge(
    renderer: &Renderer,
    top: &SourceImage,
    bottom: &SourceImage,
    params: &MergeParams,
) -> Result<OutputImage, BannerError> {
    let s = &renderer.settings;
    let top = normalize(&top.raster, s.merge_width, s.limits)?;
    let bottom = normalize(&bottom.raster, s.merge_width, s.limits)?;

    let bar = render_banner(
        &BannerSpec {
            width: s.merge_width,
            height: s.bar_height,
            text: &params.text,
            background: params.banner_color.unwrap_or(s.merge_background),
            font_px: s.merge_font_px,
            font_weight: s.font_weight,
        },
        renderer.text_fit(),
        &renderer.fonts,
    )?;

    let plan = CompositionPlan::for_layout(
        s.merge_width,
        &Layout::Split { top: &top, banner: &bar, bottom: &bottom },
        s.limits,
    )?;
    tracing::debug!(width = plan.width(), height = plan.height(), "split planned");
    let canvas = flatten(&plan, s.merge_canvas.rgba());
    encode(&canvas, crate::media::OutputFormat::Png, s.jpeg_quality)
}

/// `round(value * ratio)`, halves rounding up.
fn scaled(value: u32, ratio: f32) -> u32 {
    let scaled = (f64::from(value) * f64::from(ratio)).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = scaled.clamp(0.0, f64::from(u32::MAX)) as u32;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banner::tests::no_fonts;
    use crate::config::CanvasFill;
    use crate::fetch::tests::{png_payload, FakeSource};
    use crate::media::OutputFormat;

    fn renderer(fonts: FontBook) -> Arc<Renderer> {
        Arc::new(Renderer { fonts, settings: RenderSettings::default() })
    }

    fn decode(out: &OutputImage) -> image::RgbaImage {
        image::load_from_memory(&out.bytes).unwrap().to_rgba8()
    }

    #[test]
    fn banner_ratio_rounding() {
        assert_eq!(scaled(500, 0.15), 75);
        assert_eq!(scaled(10, 0.15), 2);
        assert_eq!(scaled(3, 0.15), 0);
    }

    #[tokio::test]
    async fn generate_sandwich_geometry() {
        let fonts = FontBook::bundled();
        let source = FakeSource::default().with("https://a/src.png", png_payload(500, 250));
        let params = GenerateParams {
            image_url: "https://a/src.png".into(),
            title: "Hello".into(),
            banner_color: None,
            format: None,
        };
        let out = generate(&source, &renderer(fonts), params).await.unwrap();

        // 500x250 -> 1000x500, banner round(500 * 0.15) = 75.
        assert_eq!((out.width, out.height), (1000, 2 * 500 + 75));
        assert_eq!(out.format, OutputFormat::Png);
        let img = decode(&out);
        assert_eq!(img.dimensions(), (1000, 1075));
        assert_eq!(*img.get_pixel(0, 500), image::Rgba([0x0a, 0x55, 0x7c, 255]));
        assert_eq!(*img.get_pixel(0, 574), image::Rgba([0x0a, 0x55, 0x7c, 255]));
        assert_eq!(*img.get_pixel(0, 575), image::Rgba([200, 30, 30, 255]));
    }

    #[tokio::test]
    async fn generate_jpeg_override() {
        let fonts = FontBook::bundled();
        let source = FakeSource::default().with("https://a/src.png", png_payload(100, 100));
        let params = GenerateParams {
            image_url: "https://a/src.png".into(),
            title: "Hi".into(),
            banner_color: Some(image::Rgb([255, 0, 0])),
            format: Some(OutputFormat::Jpeg),
        };
        let out = generate(&source, &renderer(fonts), params).await.unwrap();
        assert_eq!(out.mime_type(), "image/jpeg");
        assert_eq!((out.width, out.height), (1000, 2150));
    }

    #[tokio::test]
    async fn merge_split_geometry() {
        let fonts = FontBook::bundled();
        let source = FakeSource::default()
            .with("https://a/img1.png", png_payload(1080, 600))
            .with("https://a/img2.png", png_payload(1080, 900));
        let params = MergeParams {
            top_url: "https://a/img1.png".into(),
            bottom_url: "https://a/img2.png".into(),
            text: "Hello".into(),
            banner_color: None,
        };
        let out = merge(&source, &renderer(fonts), params).await.unwrap();
        assert_eq!((out.width, out.height), (1080, 1700));

        let img = decode(&out);
        let navy = image::Rgba([0x0d, 0x1b, 0x2a, 255]);
        assert_eq!(*img.get_pixel(0, 599), image::Rgba([200, 30, 30, 255]));
        assert_eq!(*img.get_pixel(0, 600), navy);
        assert_eq!(*img.get_pixel(1079, 799), navy);
        assert_eq!(*img.get_pixel(0, 800), image::Rgba([200, 30, 30, 255]));

        let white_in_bar = (600..800)
            .flat_map(|y| (0..1080).map(move |x| (x, y)))
            .any(|(x, y)| img.get_pixel(x, y).0[..3].iter().all(|&c| c > 240));
        assert!(white_in_bar, "bar should contain white text");
    }

    #[tokio::test]
    async fn output_is_deterministic() {
        let fonts = FontBook::bundled();
        let renderer = renderer(fonts);
        let source = FakeSource::default()
            .with("https://a/1.png", png_payload(300, 200))
            .with("https://a/2.png", png_payload(200, 300));
        let params = MergeParams {
            top_url: "https://a/1.png".into(),
            bottom_url: "https://a/2.png".into(),
            text: "Same & same".into(),
            banner_color: None,
        };
        let a = merge(&source, &renderer, params.clone()).await.unwrap();
        let b = merge(&source, &renderer, params).await.unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn tiny_image_banner_is_geometry_error() {
        let mut settings = RenderSettings::default();
        settings.generate_width = 10;
        let renderer = Renderer { fonts: no_fonts(), settings };
        let source = SourceImage {
            url: "https://a/flat.png".into(),
            raster: image::RgbaImage::new(10, 3),
        };
        let params = GenerateParams {
            image_url: source.url.clone(),
            title: "x".into(),
            banner_color: None,
            format: None,
        };
        let err = compose_generate(&renderer, &source, &params).unwrap_err();
        assert!(matches!(err, BannerError::Geometry(_)));
    }

    #[test]
    fn merge_without_fonts_fails_with_font_load() {
        let renderer = Renderer { fonts: no_fonts(), settings: RenderSettings::default() };
        let img = SourceImage {
            url: "https://a/1.png".into(),
            raster: image::RgbaImage::new(1080, 10),
        };
        let params = MergeParams {
            top_url: img.url.clone(),
            bottom_url: img.url.clone(),
            text: "Hello".into(),
            banner_color: None,
        };
        let err = compose_merge(&renderer, &img, &img, &params).unwrap_err();
        assert!(matches!(err, BannerError::FontLoad(_)));
    }

    #[test]
    fn transparent_canvas_survives_png() {
        let mut settings = RenderSettings::default();
        settings.merge_canvas = CanvasFill::Transparent;
        let renderer = Renderer { fonts: no_fonts(), settings };
        let narrow = SourceImage {
            url: "https://a/1.png".into(),
            raster: image::RgbaImage::from_pixel(1080, 10, image::Rgba([0, 0, 0, 0])),
        };
        let params = MergeParams {
            top_url: narrow.url.clone(),
            bottom_url: narrow.url.clone(),
            text: String::new(),
            banner_color: None,
        };
        let out = compose_merge(&renderer, &narrow, &narrow, &params).unwrap();
        let img = decode(&out);
        assert_eq!(img.dimensions(), (1080, 220));
        assert_eq!(img.get_pixel(5, 5).0[3], 0);
        assert_eq!(img.get_pixel(5, 15).0[3], 255);
    }

    #[tokio::test]
    async fn very_tall_source_is_geometry_error_before_allocation() {
        let source = FakeSource::default()
            .with("https://a/sliver.png", png_payload(1, 100_000))
            .with("https://a/wide.png", png_payload(1080, 600));
        let params = MergeParams {
            top_url: "https://a/sliver.png".into(),
            bottom_url: "https://a/wide.png".into(),
            text: "Hello".into(),
            banner_color: None,
        };
        let err = merge(&source, &renderer(FontBook::bundled()), params).await.unwrap_err();
        assert!(matches!(err, BannerError::Geometry(_)), "{err:?}");
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("1080x108000000"), "{err}");
    }

    #[test]
    fn stacked_height_over_pixel_budget_is_geometry_error() {
        let mut settings = RenderSettings::default();
        settings.limits.max_pixels = 1080 * 1000;
        let renderer = Renderer { fonts: no_fonts(), settings };
        let img = SourceImage {
            url: "https://a/1.png".into(),
            raster: image::RgbaImage::new(1080, 500),
        };
        let params = MergeParams {
            top_url: img.url.clone(),
            bottom_url: img.url.clone(),
            text: String::new(),
            banner_color: None,
        };
        // Each part fits on its own; the 1080x1200 canvas does not.
        let err = compose_merge(&renderer, &img, &img, &params).unwrap_err();
        assert!(matches!(err, BannerError::Geometry(_)), "{err:?}");
    }
}
