//! Replaying adapter for the `ImageSource` port.

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::BannerError;
use crate::ports::image_source::{FetchFuture, FetchedPayload, ImageSource};

/// Serves recorded fetch results from a cassette.
pub struct ReplayingImageSource {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingImageSource {
    /// Create a replaying source backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl ImageSource for ReplayingImageSource {
    fn fetch(&self, url: &str) -> FetchFuture<'_> {
        let url = url.to_string();
        let output = next_output(&self.replayer, "image_source", "fetch", &json!({ "url": url }));
        Box::pin(async move {
            let output = output.map_err(|e| BannerError::fetch(&url, e))?;
            replay_result::<FetchedPayload>(output).map_err(|e| BannerError::fetch(&url, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};

    fn replaying(output: serde_json::Value) -> ReplayingImageSource {
        let cassette = Cassette {
            name: "t".into(),
            recorded_at: chrono::Utc::now(),
            commit: "abc".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: "image_source".into(),
                method: "fetch".into(),
                input: json!({"url": "https://a/img.png"}),
                output,
            }],
        };
        ReplayingImageSource::new(Arc::new(Mutex::new(CassetteReplayer::new(&cassette))))
    }

    #[tokio::test]
    async fn replays_recorded_payload() {
        let source = replaying(json!({"Ok": {"status": 200, "content_type": "image/png", "body": "AQID"}}));
        let payload = source.fetch("https://a/img.png").await.unwrap();
        assert_eq!(payload.status, 200);
        assert_eq!(payload.content_type.as_deref(), Some("image/png"));
        assert_eq!(payload.body, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn replays_recorded_error() {
        let source = replaying(json!({"Err": "connection reset"}));
        let err = source.fetch("https://a/img.png").await.unwrap_err();
        assert!(matches!(err, BannerError::Fetch { .. }));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn unrecorded_url_is_a_fetch_error() {
        let source = replaying(json!({"Ok": {"status": 200, "body": ""}}));
        let err = source.fetch("https://a/other.png").await.unwrap_err();
        assert_eq!(err.kind(), "fetch");
    }
}
