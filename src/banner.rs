//! Banner rendering: a solid strip with one line of centered text.
//!
//! The banner is described as a small SVG document and rasterized with
//! `resvg`. User text only ever reaches the document through
//! [`escape_markup`].

use std::path::Path;
use std::sync::Arc;

use image::{Rgb, RgbaImage};
use resvg::tiny_skia;
use usvg::fontdb;

use crate::config::FontConfig;
use crate::error::BannerError;
use crate::params::hex_color;

/// Font faces available to banner text, loaded once per process.
#[derive(Clone)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook").field("faces", &self.db.len()).finish()
    }
}

/// DejaVu Sans Bold, shipped with the binary so banner text renders the
/// same on every host. License in `assets/fonts/DejaVu-LICENSE.txt`.
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");
const BUNDLED_FAMILY: &str = "DejaVu Sans";

impl FontBook {
    /// Build the font database from the configured sources.
    ///
    /// Directories are scanned best-effort; explicitly listed files must load.
    /// When the bundled face is enabled it becomes the `sans-serif` family.
    ///
    /// # Errors
    ///
    /// Returns [`BannerError::FontLoad`] if a listed file cannot be loaded.
    pub fn load(sources: &FontConfig) -> Result<Self, BannerError> {
        let mut db = fontdb::Database::new();
        if sources.bundled {
            db.load_font_data(BUNDLED_FONT.to_vec());
            db.set_sans_serif_family(BUNDLED_FAMILY);
        }
        if sources.system {
            db.load_system_fonts();
        }
        for dir in &sources.dirs {
            load_fonts_from_dir(&mut db, dir);
        }
        for file in &sources.files {
            db.load_font_file(file).map_err(|e| {
                BannerError::FontLoad(format!("failed to load font {}: {e}", file.display()))
            })?;
        }
        tracing::info!(faces = db.len(), bundled = sources.bundled, "font database ready");
        Ok(Self { db: Arc::new(db) })
    }

    /// Only the bundled face.
    #[must_use]
    pub fn bundled() -> Self {
        let mut db = fontdb::Database::new();
        db.load_font_data(BUNDLED_FONT.to_vec());
        db.set_sans_serif_family(BUNDLED_FAMILY);
        Self { db: Arc::new(db) }
    }

    /// Number of loaded faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.db.len()
    }
}

fn load_fonts_from_dir(db: &mut fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory not readable");
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "skipping font file");
        }
    }
}

/// What to draw.
#[derive(Debug, Clone)]
pub struct BannerSpec<'a> {
    /// Banner width in pixels.
    pub width: u32,
    /// Banner height in pixels.
    pub height: u32,
    /// Text, drawn white. May be empty.
    pub text: &'a str,
    /// Background fill.
    pub background: Rgb<u8>,
    /// Requested font size before fitting.
    pub font_px: f32,
    /// CSS font weight.
    pub font_weight: u16,
}

/// Parameters of the text width fitting.
#[derive(Debug, Clone, Copy)]
pub struct TextFit {
    /// Average glyph advance as a fraction of the font size.
    pub glyph_width_factor: f32,
    /// Widest the text may be, as a fraction of the banner width.
    pub max_width_ratio: f32,
}

impl Default for TextFit {
    fn default() -> Self {
        Self { glyph_width_factor: 0.55, max_width_ratio: 0.9 }
    }
}

/// Escape text for inclusion in SVG character data.
///
/// Characters that are not allowed in XML at all are dropped.
#[must_use]
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(' '),
            c if c.is_control() || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

/// Shrink `font_px` until the estimated text width fits.
///
/// The estimate is `chars * font_px * glyph_width_factor`. It never fails and
/// never grows the font.
#[must_use]
pub fn estimate_font_size(text: &str, font_px: f32, width: u32, fit: TextFit) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f32;
    #[allow(clippy::cast_precision_loss)]
    let max_width = width as f32 * fit.max_width_ratio;
    let estimated = chars * font_px * fit.glyph_width_factor;
    if estimated > max_width && estimated > 0.0 {
        (font_px * max_width / estimated).max(1.0)
    } else {
        font_px.max(1.0)
    }
}

/// Render a banner of exactly `spec.width × spec.height` pixels.
///
/// # Errors
///
/// - [`BannerError::Geometry`] if either dimension is zero.
/// - [`BannerError::FontLoad`] if there is text to draw and no font face.
/// - [`BannerError::Render`] if the generated document cannot be processed.
pub fn render_banner(
    spec: &BannerSpec<'_>,
    fit: TextFit,
    fonts: &FontBook,
) -> Result<RgbaImage, BannerError> {
    if spec.width == 0 || spec.height == 0 {
        return Err(BannerError::Geometry(format!(
            "banner must be non-empty, got {}x{}",
            spec.width, spec.height
        )));
    }

    let text = spec.text.trim();
    if !text.is_empty() && fonts.face_count() == 0 {
        return Err(BannerError::FontLoad("no font faces available for banner text".into()));
    }

    let mut font_px = estimate_font_size(text, spec.font_px, spec.width, fit);
    let mut tree = parse_svg(&banner_svg(spec, text, font_px), fonts)?;

    if let Some(measured) = text_width(tree.root()) {
        #[allow(clippy::cast_precision_loss)]
        let max_width = spec.width as f32 * fit.max_width_ratio;
        if measured > max_width {
            font_px = (font_px * max_width / measured).max(1.0);
            tracing::debug!(measured, max_width, font_px, "refitting banner text");
            tree = parse_svg(&banner_svg(spec, text, font_px), fonts)?;
        }
    }

    rasterize(&tree, spec.width, spec.height)
}

fn banner_svg(spec: &BannerSpec<'_>, text: &str, font_px: f32) -> String {
    let (w, h) = (spec.width, spec.height);
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{}"/>"#,
        hex_color(spec.background)
    ));
    if !text.is_empty() {
        svg.push_str(&format!(
            concat!(
                r#"<text x="{cx}" y="{cy}" text-anchor="middle" dominant-baseline="central" "#,
                r#"font-family="sans-serif" font-size="{size:.2}" font-weight="{weight}" "#,
                r##"fill="#ffffff">{body}</text>"##
            ),
            cx = f64::from(w) / 2.0,
            cy = f64::from(h) / 2.0,
            size = font_px,
            weight = spec.font_weight,
            body = escape_markup(text),
        ));
    }
    svg.push_str("</svg>");
    svg
}

fn parse_svg(svg: &str, fonts: &FontBook) -> Result<usvg::Tree, BannerError> {
    let opts = usvg::Options {
        fontdb: Arc::clone(&fonts.db),
        font_resolver: make_font_resolver(),
        ..Default::default()
    };
    usvg::Tree::from_str(svg, &opts).map_err(|e| BannerError::Render(e.to_string()))
}

/// Resolve the requested family, then any sans-serif face, then any face at all.
fn make_font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, db| {
            let mut families = Vec::<fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => fontdb::Family::Name(s),
                });
            }
            families.push(fontdb::Family::SansSerif);

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };

            db.query(&query).or_else(|| db.faces().next().map(|f| f.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

/// Widest laid-out text node in the tree.
fn text_width(group: &usvg::Group) -> Option<f32> {
    group
        .children()
        .iter()
        .filter_map(|node| match node {
            usvg::Node::Group(g) => text_width(g.as_ref()),
            usvg::Node::Text(t) => Some(t.bounding_box().width()),
            usvg::Node::Path(_) | usvg::Node::Image(_) => None,
        })
        .reduce(f32::max)
}

fn rasterize(tree: &usvg::Tree, width: u32, height: u32) -> Result<RgbaImage, BannerError> {
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| BannerError::Geometry(format!("cannot allocate {width}x{height} banner")))?;
    resvg::render(tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    let mut raw = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(width, height, raw)
        .ok_or_else(|| BannerError::Render("pixmap size mismatch".into()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    const TEAL: Rgb<u8> = Rgb([0x0a, 0x55, 0x7c]);

    /// A book with no faces at all.
    pub(crate) fn no_fonts() -> FontBook {
        FontBook::load(&FontConfig { bundled: false, system: false, dirs: vec![], files: vec![] })
            .unwrap()
    }

    fn spec(text: &str) -> BannerSpec<'_> {
        BannerSpec {
            width: 200,
            height: 40,
            text,
            background: TEAL,
            font_px: 18.0,
            font_weight: 700,
        }
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_markup("a & b"), "a &amp; b");
        assert_eq!(escape_markup("<script>"), "&lt;script&gt;");
        assert_eq!(escape_markup(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_markup("bell\u{7}"), "bell");
        assert_eq!(escape_markup("two\nlines"), "two lines");
    }

    #[test]
    fn generated_markup_is_well_formed() {
        let svg = banner_svg(&spec("</text><rect/>&amp;"), "</text><rect/>&amp;", 18.0);
        assert!(svg.contains("&lt;/text&gt;&lt;rect/&gt;&amp;amp;"));
        assert_eq!(svg.matches("<text").count(), 1);
        assert_eq!(svg.matches("<rect").count(), 1);

        let empty = no_fonts();
        assert!(parse_svg(&svg, &empty).is_ok());
    }

    #[test]
    fn estimate_shrinks_long_text_only() {
        let fit = TextFit::default();
        assert!((estimate_font_size("Hi", 45.0, 1000, fit) - 45.0).abs() < f32::EPSILON);

        let long = "x".repeat(100);
        let size = estimate_font_size(&long, 45.0, 1000, fit);
        assert!(size < 45.0);
        assert!(100.0 * size * 0.55 <= 900.0 + 0.01);

        assert!(estimate_font_size(&"x".repeat(100_000), 45.0, 10, fit) >= 1.0);
        assert!((estimate_font_size("", 45.0, 1000, fit) - 45.0).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_text_renders_plain_fill_without_fonts() {
        let fonts = no_fonts();
        let banner = render_banner(&spec(""), TextFit::default(), &fonts).unwrap();
        assert_eq!(banner.dimensions(), (200, 40));
        assert!(banner.pixels().all(|p| *p == image::Rgba([0x0a, 0x55, 0x7c, 255])));
    }

    #[test]
    fn text_without_fonts_is_font_load_error() {
        let fonts = no_fonts();
        let err = render_banner(&spec("Hello"), TextFit::default(), &fonts).unwrap_err();
        assert!(matches!(err, BannerError::FontLoad(_)));
    }

    #[test]
    fn missing_font_file_is_font_load_error() {
        let sources = FontConfig {
            bundled: false,
            system: false,
            dirs: vec![],
            files: vec![PathBuf::from("/nonexistent/font.ttf")],
        };
        let err = FontBook::load(&sources).unwrap_err();
        assert!(matches!(err, BannerError::FontLoad(_)));
    }

    #[test]
    fn bundled_face_renders_without_host_fonts() {
        let sources = FontConfig { bundled: true, system: false, dirs: vec![], files: vec![] };
        let fonts = FontBook::load(&sources).unwrap();
        assert_eq!(fonts.face_count(), 1);
        let banner = render_banner(&spec("Hi"), TextFit::default(), &fonts).unwrap();
        assert!(banner.pixels().any(|p| p.0[..3].iter().all(|&c| c > 240)));
    }

    #[test]
    fn zero_height_is_geometry_error() {
        let fonts = no_fonts();
        let mut s = spec("");
        s.height = 0;
        assert!(matches!(
            render_banner(&s, TextFit::default(), &fonts),
            Err(BannerError::Geometry(_))
        ));
    }

    #[test]
    fn text_is_drawn_white_and_centered() {
        let fonts = FontBook::bundled();
        let banner = render_banner(&spec("HHHH"), TextFit::default(), &fonts).unwrap();
        assert_eq!(banner.dimensions(), (200, 40));

        // Corners stay background.
        assert_eq!(*banner.get_pixel(0, 0), image::Rgba([0x0a, 0x55, 0x7c, 255]));
        assert_eq!(*banner.get_pixel(199, 39), image::Rgba([0x0a, 0x55, 0x7c, 255]));

        let white: Vec<(u32, u32)> = banner
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] > 240 && p.0[1] > 240 && p.0[2] > 240)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!white.is_empty(), "expected white glyph pixels");

        let min_x = white.iter().map(|p| p.0).min().unwrap();
        let max_x = white.iter().map(|p| p.0).max().unwrap();
        let center = (min_x + max_x) / 2;
        assert!((90..=110).contains(&center), "text center {center} not near 100");
    }

    #[test]
    fn hostile_text_renders() {
        let fonts = FontBook::bundled();
        let text = "<svg onload=alert(1)> & </text>";
        let banner = render_banner(&spec(text), TextFit::default(), &fonts).unwrap();
        assert_eq!(banner.dimensions(), (200, 40));
    }

    #[test]
    fn long_text_is_fitted_not_rejected() {
        let fonts = FontBook::bundled();
        let text = "W".repeat(80);
        let banner = render_banner(&spec(&text), TextFit::default(), &fonts).unwrap();
        assert_eq!(banner.dimensions(), (200, 40));
        // Outer 5% of each side stays background.
        for y in 0..40 {
            assert_eq!(*banner.get_pixel(0, y), image::Rgba([0x0a, 0x55, 0x7c, 255]));
            assert_eq!(*banner.get_pixel(199, y), image::Rgba([0x0a, 0x55, 0x7c, 255]));
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let fonts = FontBook::bundled();
        let a = render_banner(&spec("Same"), TextFit::default(), &fonts).unwrap();
        let b = render_banner(&spec("Same"), TextFit::default(), &fonts).unwrap();
        assert_eq!(a, b);
    }
}
