//! Service context that bundles the port trait objects and shared resources.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::adapters::live::http::HttpImageSource;
use crate::adapters::recording::image_source::RecordingImageSource;
use crate::adapters::replaying::image_source::ReplayingImageSource;
use crate::banner::FontBook;
use crate::cassette::config::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::Config;
use crate::error::BannerError;
use crate::pipeline::Renderer;
use crate::ports::ImageSource;

/// Everything an invocation needs. Built once per process, shared read-only.
pub struct ServiceContext {
    /// Image source port.
    pub source: Arc<dyn ImageSource>,
    /// Fonts and layout settings.
    pub renderer: Arc<Renderer>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Finish the recording and write cassette files to disk.
    ///
    /// Every context sharing the recorder must have been dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written.
    pub fn finish(self) -> Result<std::path::PathBuf, String> {
        let recorder = Arc::try_unwrap(self.recorder)
            .map_err(|_| "Recording adapter still has references".to_string())?
            .into_inner()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        tracing::info!(interactions = recorder.interaction_count(), "writing cassette");
        recorder.finish().map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Assemble a context from parts.
    #[must_use]
    pub fn new(source: Arc<dyn ImageSource>, renderer: Renderer) -> Self {
        Self { source, renderer: Arc::new(renderer) }
    }

    /// Create a live context that fetches over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid, a configured font
    /// cannot be loaded, or the HTTP client cannot be built.
    pub fn live(config: &Config) -> Result<Self, BannerError> {
        let source = HttpImageSource::new(&config.fetch)?;
        Ok(Self::new(Arc::new(source), build_renderer(config)?))
    }

    /// Create a recording context that wraps the live source with a recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the live context cannot be built.
    pub fn recording(config: &Config) -> Result<(Self, RecordingSession), BannerError> {
        let live = HttpImageSource::new(&config.fetch)?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = std::path::PathBuf::from(".bannergen/cassettes").join(&timestamp);

        let commit = get_commit_hash();
        let path = output_dir.join("image_source.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-image_source"),
            &commit,
        )));

        let source = RecordingImageSource::new(Box::new(live), Arc::clone(&recorder));
        let ctx = Self::new(Arc::new(source), build_renderer(config)?);
        let session = RecordingSession { recorder };

        Ok((ctx, session))
    }

    /// Create a replaying context from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path, config: &Config) -> Result<Self, BannerError> {
        let replayer = load_cassette(path)
            .map_err(|e| BannerError::Config(format!("Failed to load cassette: {e}")))?;
        let source = ReplayingImageSource::new(Arc::new(Mutex::new(replayer)));
        Ok(Self::new(Arc::new(source), build_renderer(config)?))
    }
}

fn build_renderer(config: &Config) -> Result<Renderer, BannerError> {
    let settings = config.render_settings().map_err(BannerError::Config)?;
    let fonts = FontBook::load(&config.font_sources())?;
    if fonts.face_count() == 0 {
        tracing::warn!("no fonts loaded; banners with text will fail");
    }
    Ok(Renderer { fonts, settings })
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
