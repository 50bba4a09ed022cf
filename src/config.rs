//! Configuration file loading with environment variable overrides.

use std::path::{Path, PathBuf};

use image::Rgb;
use serde::Deserialize;

use crate::compose::CanvasLimits;
use crate::media::OutputFormat;
use crate::params::parse_hex_color;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Upstream fetch settings.
    pub fetch: FetchConfig,
    /// Font discovery.
    pub fonts: FontConfig,
    /// Banner text settings shared by both functions.
    pub text: TextConfig,
    /// `generate` function settings.
    pub generate: GenerateConfig,
    /// `merge` function settings.
    pub merge: MergeConfig,
    /// Size caps on everything allocated per request.
    pub limits: LimitsConfig,
}

/// HTTP server settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

/// Upstream fetch settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent upstream.
    pub user_agent: String,
    /// Largest response body accepted, in bytes.
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("bannergen/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Where banner fonts come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Load the font compiled into the binary.
    pub bundled: bool,
    /// Load fonts installed on the host.
    pub system: bool,
    /// Directories scanned for `.ttf`, `.otf` and `.ttc` files.
    pub dirs: Vec<PathBuf>,
    /// Individual font files. Each must load.
    pub files: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { bundled: true, system: true, dirs: Vec::new(), files: Vec::new() }
    }
}

/// Banner text settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// CSS font weight of the banner text.
    pub font_weight: u16,
    /// Average glyph advance as a fraction of the font size.
    pub glyph_width_factor: f32,
    /// Widest the text may be, as a fraction of the banner width.
    pub max_width_ratio: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { font_weight: 700, glyph_width_factor: 0.55, max_width_ratio: 0.9 }
    }
}

/// Background of the blank canvas parts are composited onto.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasFill {
    /// Opaque white.
    #[default]
    White,
    /// Fully transparent. JPEG output flattens it onto white.
    Transparent,
}

impl CanvasFill {
    /// RGBA value of the fill.
    #[must_use]
    pub fn rgba(self) -> image::Rgba<u8> {
        match self {
            Self::White => image::Rgba([255, 255, 255, 255]),
            Self::Transparent => image::Rgba([0, 0, 0, 0]),
        }
    }
}

/// `generate` function settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Width every source image is normalized to.
    pub width: u32,
    /// Banner height as a fraction of the normalized image height.
    pub banner_ratio: f32,
    /// Font size as a fraction of the banner height.
    pub font_ratio: f32,
    /// Default banner color.
    pub background: String,
    /// Canvas fill.
    pub canvas: CanvasFill,
    /// Default output encoding.
    pub format: OutputFormat,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            banner_ratio: 0.15,
            font_ratio: 0.45,
            background: "#0a557c".to_string(),
            canvas: CanvasFill::White,
            format: OutputFormat::Png,
            jpeg_quality: 90,
        }
    }
}

/// `merge` function settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Width both images are normalized to.
    pub width: u32,
    /// Fixed height of the bar between the images.
    pub bar_height: u32,
    /// Font size of the bar text in pixels.
    pub font_px: f32,
    /// Default bar color.
    pub background: String,
    /// Canvas fill.
    pub canvas: CanvasFill,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            bar_height: 200,
            font_px: 64.0,
            background: "#0d1b2a".to_string(),
            canvas: CanvasFill::Transparent,
        }
    }
}

/// Per-request allocation caps.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest width or height of any normalized image or output canvas.
    pub max_dimension: u32,
    /// Largest pixel count of the output canvas.
    pub max_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_dimension: 16_384, max_pixels: 40_000_000 }
    }
}

/// Resolved, validated render settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// `generate` target width.
    pub generate_width: u32,
    /// `generate` banner height ratio.
    pub banner_ratio: f32,
    /// `generate` font size ratio.
    pub font_ratio: f32,
    /// `generate` default banner color.
    pub generate_background: Rgb<u8>,
    /// `generate` canvas fill.
    pub generate_canvas: CanvasFill,
    /// `generate` default output encoding.
    pub generate_format: OutputFormat,
    /// JPEG quality.
    pub jpeg_quality: u8,
    /// `merge` target width.
    pub merge_width: u32,
    /// `merge` bar height.
    pub bar_height: u32,
    /// `merge` font size.
    pub merge_font_px: f32,
    /// `merge` default bar color.
    pub merge_background: Rgb<u8>,
    /// `merge` canvas fill.
    pub merge_canvas: CanvasFill,
    /// Banner text weight.
    pub font_weight: u16,
    /// Heuristic glyph width factor.
    pub glyph_width_factor: f32,
    /// Maximum text width ratio.
    pub max_width_ratio: f32,
    /// Caps on normalized images and the output canvas.
    pub limits: CanvasLimits,
}

#[cfg(test)]
impl Default for RenderSettings {
    fn default() -> Self {
        Config::default().render_settings().expect("default config is valid")
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// Address to listen on, preferring `BANNERGEN_BIND`, then `PORT`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        if let Ok(bind) = std::env::var("BANNERGEN_BIND") {
            return bind;
        }
        match std::env::var("PORT") {
            Ok(port) => {
                let host = self.server.bind.rsplit_once(':').map_or("0.0.0.0", |(h, _)| h);
                format!("{host}:{port}")
            }
            Err(_) => self.server.bind.clone(),
        }
    }

    /// Font sources, with `BANNERGEN_FONT_DIR` appended to the directories.
    #[must_use]
    pub fn font_sources(&self) -> FontConfig {
        let mut sources = self.fonts.clone();
        if let Ok(dir) = std::env::var("BANNERGEN_FONT_DIR") {
            sources.dirs.push(PathBuf::from(dir));
        }
        sources
    }

    /// Validate values and resolve colors.
    ///
    /// # Errors
    ///
    /// Returns an error for zero sizes or timeouts, sizes above the limits,
    /// ratios outside `(0, 1]` or malformed colors.
    pub fn render_settings(&self) -> Result<RenderSettings, String> {
        let g = &self.generate;
        let m = &self.merge;
        let t = &self.text;
        let l = &self.limits;

        if self.fetch.timeout_secs == 0 || self.fetch.max_body_bytes == 0 {
            return Err("fetch.timeout_secs and fetch.max_body_bytes must be positive".to_string());
        }
        if l.max_dimension == 0 || l.max_pixels == 0 {
            return Err("limits.max_dimension and limits.max_pixels must be positive".to_string());
        }
        if g.width == 0 || m.width == 0 {
            return Err("generate.width and merge.width must be positive".to_string());
        }
        if m.bar_height == 0 {
            return Err("merge.bar_height must be positive".to_string());
        }
        for (name, size) in
            [("generate.width", g.width), ("merge.width", m.width), ("merge.bar_height", m.bar_height)]
        {
            if size > l.max_dimension {
                return Err(format!(
                    "{name} {size} exceeds limits.max_dimension {}",
                    l.max_dimension
                ));
            }
        }
        for (name, ratio) in [
            ("generate.banner_ratio", g.banner_ratio),
            ("generate.font_ratio", g.font_ratio),
            ("text.max_width_ratio", t.max_width_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(format!("{name} must be in (0, 1], got {ratio}"));
            }
        }
        if !(t.glyph_width_factor > 0.0) || !(m.font_px > 0.0) {
            return Err("text.glyph_width_factor and merge.font_px must be positive".to_string());
        }
        if !(1..=100).contains(&g.jpeg_quality) {
            return Err(format!("generate.jpeg_quality must be 1-100, got {}", g.jpeg_quality));
        }

        Ok(RenderSettings {
            generate_width: g.width,
            banner_ratio: g.banner_ratio,
            font_ratio: g.font_ratio,
            generate_background: parse_hex_color(&g.background)?,
            generate_canvas: g.canvas,
            generate_format: g.format,
            jpeg_quality: g.jpeg_quality,
            merge_width: m.width,
            bar_height: m.bar_height,
            merge_font_px: m.font_px,
            merge_background: parse_hex_color(&m.background)?,
            merge_canvas: m.canvas,
            font_weight: t.font_weight,
            glyph_width_factor: t.glyph_width_factor,
            max_width_ratio: t.max_width_ratio,
            limits: CanvasLimits { max_dimension: l.max_dimension, max_pixels: l.max_pixels },
        })
    }
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `BANNERGEN_CONFIG` environment variable
/// 3. `~/.config/bannergen/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("BANNERGEN_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

/// Default config path: `~/.config/bannergen/config.toml`.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/bannergen/config.toml")
    } else {
        PathBuf::from("bannergen.toml")
    }
}
