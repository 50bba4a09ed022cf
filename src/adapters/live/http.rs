//! Live adapter that fetches images over HTTP with `reqwest`.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::error::BannerError;
use crate::ports::image_source::{FetchFuture, FetchedPayload, ImageSource};

/// Fetches images with a shared `reqwest` client.
pub struct HttpImageSource {
    client: Client,
    max_body_bytes: u64,
}

impl HttpImageSource {
    /// Build a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &FetchConfig) -> Result<Self, BannerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| BannerError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, max_body_bytes: config.max_body_bytes })
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> FetchFuture<'_> {
        let url = url.to_string();
        Box::pin(async move {
            let mut response =
                self.client.get(&url).send().await.map_err(|e| BannerError::fetch(&url, e))?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let too_large = || {
                BannerError::fetch(&url, format!("body exceeds {} bytes", self.max_body_bytes))
            };
            if response.content_length().is_some_and(|len| len > self.max_body_bytes) {
                return Err(too_large());
            }

            // Content-Length may be absent or wrong, so count while streaming.
            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await.map_err(|e| BannerError::fetch(&url, e))? {
                let total = u64::try_from(body.len() + chunk.len()).unwrap_or(u64::MAX);
                if total > self.max_body_bytes {
                    return Err(too_large());
                }
                body.extend_from_slice(&chunk);
            }

            tracing::debug!(%url, status, ?content_type, bytes = body.len(), "fetched upstream");
            Ok(FetchedPayload { status, content_type, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Serve one canned response on a loopback port and return its URL.
    fn serve_once(content_length: bool, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            let mut head = String::from("HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n");
            if content_length {
                head.push_str(&format!("Content-Length: {}\r\n", body.len()));
            }
            head.push_str("\r\n");
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        });
        format!("http://{addr}/img.png")
    }

    fn source(max_body_bytes: u64) -> HttpImageSource {
        // Loopback only; ignore any proxy set in the environment.
        let client = Client::builder().no_proxy().build().unwrap();
        HttpImageSource { client, max_body_bytes }
    }

    #[tokio::test]
    async fn body_within_limit_is_returned() {
        let url = serve_once(true, vec![7u8; 512]);
        let payload = source(1024).fetch(&url).await.unwrap();
        assert_eq!(payload.status, 200);
        assert_eq!(payload.content_type.as_deref(), Some("image/png"));
        assert_eq!(payload.body.len(), 512);
    }

    #[tokio::test]
    async fn declared_oversized_body_is_fetch_error() {
        let url = serve_once(true, vec![7u8; 4096]);
        let err = source(1024).fetch(&url).await.unwrap_err();
        assert!(matches!(err, BannerError::Fetch { .. }), "{err:?}");
        assert!(err.to_string().contains("body exceeds 1024 bytes"), "{err}");
    }

    #[tokio::test]
    async fn undeclared_oversized_body_is_fetch_error() {
        let url = serve_once(false, vec![7u8; 4096]);
        let err = source(1024).fetch(&url).await.unwrap_err();
        assert!(matches!(err, BannerError::Fetch { .. }), "{err:?}");
    }
}
