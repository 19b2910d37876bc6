//! Image upload collaborator: turns encoded image bytes into a public URL
//! the vision model and search backends can fetch.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

/// imgbb-compatible upload endpoint.
pub const IMGBB_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image host not configured (missing API key)")]
    NotConfigured,

    #[error("image host unreachable: {0}")]
    Network(String),

    #[error("image host returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("image host response unreadable: {0}")]
    ResponseParsing(String),
}

/// Hosts an image and returns its URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, bytes: &[u8]) -> Result<String, UploadError>;
}

/// imgbb: form POST of `{key, image: base64}`; URL in `data.url`.
pub struct ImgbbHost {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ImgbbResponse {
    data: ImgbbData,
}

#[derive(Deserialize)]
struct ImgbbData {
    url: String,
}

impl ImgbbHost {
    pub fn new(client: reqwest::Client, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: IMGBB_UPLOAD_URL.to_string(),
            api_key,
            timeout,
        }
    }

    /// Point at a different upload endpoint (tests, self-hosted mirrors).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl ImageHost for ImgbbHost {
    async fn upload(&self, bytes: &[u8]) -> Result<String, UploadError> {
        let key = self.api_key.as_deref().ok_or(UploadError::NotConfigured)?;
        let image = base64::engine::general_purpose::STANDARD.encode(bytes);

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .form(&[("key", key), ("image", image.as_str())])
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ImgbbResponse = response
            .json()
            .await
            .map_err(|e| UploadError::ResponseParsing(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), url = %parsed.data.url, "Image uploaded");
        Ok(parsed.data.url)
    }
}

/// Mock image host for testing: hands out sequential URLs and remembers
/// what it was given.
pub struct MockImageHost {
    base_url: String,
    fail: bool,
    uploads: Mutex<Vec<Vec<u8>>>,
}

impl MockImageHost {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fail: false,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("http://unused")
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().map(|u| u.len()).unwrap_or(0)
    }

    pub fn uploaded(&self, index: usize) -> Option<Vec<u8>> {
        self.uploads.lock().ok()?.get(index).cloned()
    }
}

#[async_trait]
impl ImageHost for MockImageHost {
    async fn upload(&self, bytes: &[u8]) -> Result<String, UploadError> {
        if self.fail {
            return Err(UploadError::Rejected {
                status: 400,
                body: "mock failure".into(),
            });
        }
        let mut uploads = self
            .uploads
            .lock()
            .map_err(|_| UploadError::Network("mock lock poisoned".into()))?;
        uploads.push(bytes.to_vec());
        Ok(format!("{}/upload/{}.jpg", self.base_url, uploads.len()))
    }
}

/// Decode a base64 data URL to raw bytes.
///
/// Handles both `data:image/jpeg;base64,...` and raw base64 strings.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, String> {
    let base64_data = match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    };

    base64::engine::general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| format!("Base64 decode failed: {e}"))
}

/// Detect a supported image format from magic bytes.
pub fn detect_image_format(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        Some("jpeg")
    } else if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        Some("png")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else if bytes.len() >= 6 && (&bytes[0..6] == b"GIF87a" || &bytes[0..6] == b"GIF89a") {
        Some("gif")
    } else {
        None
    }
}
