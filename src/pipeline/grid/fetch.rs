//! Concurrent thumbnail download with a per-fetch timeout.

use std::time::Duration;

use futures_util::future::join_all;
use futures_util::StreamExt;

use super::tile::TileFailure;
use crate::pipeline::upload::decode_data_url;

/// Upper bound on a single thumbnail body.
const MAX_THUMBNAIL_BYTES: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct ThumbnailFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl ThumbnailFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            max_bytes: MAX_THUMBNAIL_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Fetch every URL concurrently. Output order matches input order, so
    /// result `i` always belongs to slide `i`.
    pub async fn fetch_all(&self, urls: &[&str]) -> Vec<Result<Vec<u8>, TileFailure>> {
        join_all(urls.iter().map(|url| self.fetch(url))).await
    }

    /// Fetch one thumbnail. `data:` URLs are decoded in place.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, TileFailure> {
        if url.starts_with("data:") {
            return decode_data_url(url).map_err(TileFailure::Decode);
        }

        match tokio::time::timeout(self.timeout, self.download(url)).await {
            Ok(result) => result,
            Err(_) => Err(TileFailure::Fetch(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TileFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TileFailure::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TileFailure::Fetch(format!("HTTP {status}")));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_bytes as u64 {
                return Err(TileFailure::Fetch(format!("body too large ({declared} bytes)")));
            }
        }

        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| TileFailure::Fetch(e.to_string()))?;
            if body.len() + chunk.len() > self.max_bytes {
                return Err(TileFailure::Fetch(format!(
                    "body too large (over {} bytes)",
                    self.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::grid::tile::tests::png_bytes;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use base64::Engine;

    /// Loopback thumbnail server: `/ok.png`, `/red.png`, `/broken` (not an
    /// image), `/missing` (404), `/large` (4 KB with a length), `/chunked`
    /// (4 KB streamed without one), `/slow` (stalls past any test timeout).
    pub(crate) async fn spawn_thumbnail_server() -> String {
        async fn ok() -> impl IntoResponse {
            ([(header::CONTENT_TYPE, "image/png")], png_bytes(8, 8, [0, 128, 0]))
        }
        async fn red() -> impl IntoResponse {
            ([(header::CONTENT_TYPE, "image/png")], png_bytes(8, 8, [220, 0, 0]))
        }
        async fn broken() -> &'static str {
            "<html>definitely not a png</html>"
        }
        async fn missing() -> StatusCode {
            StatusCode::NOT_FOUND
        }
        async fn large() -> Vec<u8> {
            vec![0u8; 4096]
        }
        async fn chunked() -> axum::body::Body {
            let chunks = futures_util::stream::iter(
                (0..4).map(|_| Ok::<_, std::io::Error>(axum::body::Bytes::from(vec![0u8; 1024]))),
            );
            axum::body::Body::from_stream(chunks)
        }
        async fn slow() -> &'static str {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "late"
        }

        let app = Router::new()
            .route("/ok.png", get(ok))
            .route("/red.png", get(red))
            .route("/broken", get(broken))
            .route("/missing", get(missing))
            .route("/large", get(large))
            .route("/chunked", get(chunked))
            .route("/slow", get(slow));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher(timeout_ms: u64) -> ThumbnailFetcher {
        ThumbnailFetcher::new(reqwest::Client::new(), Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn fetches_image_bytes() {
        let base = spawn_thumbnail_server().await;
        let bytes = fetcher(2_000).fetch(&format!("{base}/ok.png")).await.unwrap();
        assert_eq!(&bytes[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_failure() {
        let base = spawn_thumbnail_server().await;
        let err = fetcher(2_000).fetch(&format!("{base}/missing")).await.unwrap_err();
        assert_eq!(err, TileFailure::Fetch("HTTP 404 Not Found".into()));
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let base = spawn_thumbnail_server().await;
        let err = fetcher(100).fetch(&format!("{base}/slow")).await.unwrap_err();
        assert!(matches!(err, TileFailure::Fetch(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let base = spawn_thumbnail_server().await;
        let capped = fetcher(2_000).with_max_bytes(1024);

        let err = capped.fetch(&format!("{base}/large")).await.unwrap_err();
        assert_eq!(err, TileFailure::Fetch("body too large (4096 bytes)".into()));

        let err = capped.fetch(&format!("{base}/chunked")).await.unwrap_err();
        assert!(matches!(err, TileFailure::Fetch(ref m) if m.contains("over 1024 bytes")));

        assert!(capped.fetch(&format!("{base}/ok.png")).await.is_ok());
    }

    #[tokio::test]
    async fn data_url_is_decoded_locally() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(2, 2, [1, 2, 3]));
        let url = format!("data:image/png;base64,{encoded}");
        let bytes = fetcher(10).fetch(&url).await.unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let err = fetcher(10).fetch("data:image/png;base64,@@@").await.unwrap_err();
        assert!(matches!(err, TileFailure::Decode(_)));
    }

    #[tokio::test]
    async fn fetch_all_preserves_order_across_failures() {
        let base = spawn_thumbnail_server().await;
        let urls = [
            format!("{base}/slow"),
            format!("{base}/ok.png"),
            format!("{base}/missing"),
            format!("{base}/broken"),
        ];
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let results = fetcher(300).fetch_all(&refs).await;

        assert_eq!(results.len(), 4);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        // Broken bodies download fine; they fail later at decode.
        assert!(results[3].is_ok());
    }
}
