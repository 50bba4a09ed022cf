//! Recording adapter for the `ImageSource` port.

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::image_source::{FetchFuture, ImageSource};

/// Records fetch interactions while delegating to an inner implementation.
pub struct RecordingImageSource {
    inner: Box<dyn ImageSource>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingImageSource {
    /// Creates a new recording source wrapping the given implementation.
    pub fn new(inner: Box<dyn ImageSource>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl ImageSource for RecordingImageSource {
    fn fetch(&self, url: &str) -> FetchFuture<'_> {
        let url = url.to_string();
        let recorder = Arc::clone(&self.recorder);

        Box::pin(async move {
            let result = self.inner.fetch(&url).await;
            record_result(&recorder, "image_source", "fetch", &json!({ "url": url }), &result);
            result
        })
    }
}
