//! File naming and saving for `invoke` output.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::BannerError;
use crate::handlers::FunctionResponse;
use crate::media::OutputFormat;

/// Generate an output filename from banner text and an extension.
///
/// Sanitizes the first 50 characters of the text to kebab-case,
/// appends a unix timestamp, and adds the extension.
#[must_use]
pub fn auto_filename(text: &str, extension: &str) -> String {
    let sanitized = sanitize_for_filename(text, 50);
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    format!("{sanitized}-{timestamp}.{extension}")
}

/// Sanitize a string for use in a filename.
///
/// Converts to lowercase, replaces non-alphanumeric chars with hyphens,
/// collapses consecutive hyphens, and trims to max length.
#[must_use]
pub fn sanitize_for_filename(input: &str, max_len: usize) -> String {
    let mut result = String::with_capacity(max_len);
    let mut last_was_hyphen = true; // Prevents leading hyphen

    for ch in input.chars().take(max_len * 2) {
        if result.len() >= max_len {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        "banner".to_string()
    } else {
        result
    }
}

/// Extension matching a response's `Content-Type`.
#[must_use]
pub fn extension_for(response: &FunctionResponse) -> &'static str {
    let content_type = response.headers.get("Content-Type").map(String::as_str);
    [OutputFormat::Png, OutputFormat::Jpeg]
        .into_iter()
        .find(|format| Some(format.mime_type()) == content_type)
        .map_or("bin", OutputFormat::extension)
}

/// Resolve the output path: use explicit path or auto-generate.
#[must_use]
pub fn resolve_output_path(explicit: Option<&str>, text: &str, extension: &str) -> PathBuf {
    match explicit {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(auto_filename(text, extension)),
    }
}

/// Write a successful response's decoded body to `path`.
///
/// # Errors
///
/// Returns an error if the body is not valid base64 or cannot be written.
pub fn save_response(response: &FunctionResponse, path: &Path) -> Result<(), BannerError> {
    let bytes = response
        .body_bytes()
        .map_err(|e| BannerError::Internal(format!("response body is not base64: {e}")))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn png_response() -> FunctionResponse {
        FunctionResponse {
            status_code: 200,
            headers: BTreeMap::from([("Content-Type".into(), "image/png".into())]),
            body: "AQID".into(),
            is_base64_encoded: true,
        }
    }

    #[test]
    fn sanitize_basic() {
        assert_eq!(sanitize_for_filename("Hello World", 50), "hello-world");
    }

    #[test]
    fn sanitize_special_chars() {
        assert_eq!(sanitize_for_filename("10 Tips & Tricks!!", 50), "10-tips-tricks");
    }

    #[test]
    fn sanitize_truncates() {
        let long = "a".repeat(100);
        let result = sanitize_for_filename(&long, 10);
        assert!(result.len() <= 10);
    }

    #[test]
    fn sanitize_empty() {
        assert_eq!(sanitize_for_filename("", 50), "banner");
        assert_eq!(sanitize_for_filename("<<>>", 50), "banner");
    }

    #[test]
    fn auto_filename_format() {
        let name = auto_filename("Summer Sale", "jpg");
        assert!(name.starts_with("summer-sale-"));
        assert_eq!(Path::new(&name).extension().unwrap(), "jpg");
    }

    #[test]
    fn extension_from_content_type() {
        assert_eq!(extension_for(&png_response()), "png");
        let mut jpeg = png_response();
        jpeg.headers.insert("Content-Type".into(), "image/jpeg".into());
        assert_eq!(extension_for(&jpeg), "jpg");
    }

    #[test]
    fn resolve_explicit() {
        let path = resolve_output_path(Some("pin.png"), "ignored", "png");
        assert_eq!(path, PathBuf::from("pin.png"));
    }

    #[test]
    fn save_writes_decoded_bytes() {
        let path = std::env::temp_dir().join("bannergen_output_save_test.png");
        save_response(&png_response(), &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        let _ = std::fs::remove_file(&path);
    }
}
