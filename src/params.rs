//! Query parameter parsing and validation for the two functions.

use std::collections::HashMap;

use image::Rgb;
use reqwest::Url;

use crate::media::OutputFormat;

/// Validated parameters of a `generate` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    /// Source image shown above and below the banner.
    pub image_url: String,
    /// Banner text.
    pub title: String,
    /// Banner color override.
    pub banner_color: Option<Rgb<u8>>,
    /// Output encoding override.
    pub format: Option<OutputFormat>,
}

/// Validated parameters of a `merge` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeParams {
    /// Image placed above the banner.
    pub top_url: String,
    /// Image placed below the banner.
    pub bottom_url: String,
    /// Banner text.
    pub text: String,
    /// Banner color override.
    pub banner_color: Option<Rgb<u8>>,
}

impl GenerateParams {
    /// Validate a raw query map.
    ///
    /// # Errors
    ///
    /// Returns an error if `imgUrl` or `title` is missing or empty, or if any
    /// value is malformed.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, String> {
        let (Some(image_url), Some(title)) = (non_empty(query, "imgUrl"), non_empty(query, "title"))
        else {
            return Err("imgUrl and title are required query parameters".to_string());
        };
        Ok(Self {
            image_url: validate_image_url(image_url)?,
            title: title.to_string(),
            banner_color: non_empty(query, "bannerColor").map(parse_hex_color).transpose()?,
            format: non_empty(query, "format").map(OutputFormat::parse).transpose()?,
        })
    }
}

impl MergeParams {
    /// Validate a raw query map.
    ///
    /// # Errors
    ///
    /// Returns an error if `top`, `bottom` or `text` is missing or empty, or
    /// if any value is malformed.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, String> {
        let (Some(top), Some(bottom), Some(text)) =
            (non_empty(query, "top"), non_empty(query, "bottom"), non_empty(query, "text"))
        else {
            return Err("Missing top, bottom or text query parameters".to_string());
        };
        Ok(Self {
            top_url: validate_image_url(top)?,
            bottom_url: validate_image_url(bottom)?,
            text: text.to_string(),
            banner_color: non_empty(query, "bannerColor").map(parse_hex_color).transpose()?,
        })
    }
}

fn non_empty<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// Validate that a caller-supplied URL is absolute `http` or `https`.
///
/// # Errors
///
/// Returns an error if the URL does not parse or uses another scheme.
pub fn validate_image_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw).map_err(|e| format!("Invalid image URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(format!("Unsupported URL scheme '{other}' in '{raw}'. Valid: http, https")),
    }
}

/// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb` into an opaque color.
///
/// # Errors
///
/// Returns an error if the value is not a 3- or 6-digit hex color.
pub fn parse_hex_color(raw: &str) -> Result<Rgb<u8>, String> {
    let hex = raw.trim().trim_start_matches('#');
    let invalid = || format!("Invalid color '{raw}'. Expected #rrggbb or #rgb");
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        6 => Ok(Rgb([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?])),
        3 => {
            let mut out = [0u8; 3];
            for (slot, i) in out.iter_mut().zip(0..3) {
                *slot = channel(&hex[i..=i])? * 17;
            }
            Ok(Rgb(out))
        }
        _ => Err(invalid()),
    }
}

/// Format a color as `#rrggbb` for SVG markup.
#[must_use]
pub fn hex_color(color: Rgb<u8>) -> String {
    let Rgb([r, g, b]) = color;
    format!("#{r:02x}{g:02x}{b:02x}")
}
