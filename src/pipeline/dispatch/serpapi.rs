//! SerpApi engines: Google web search, Google reverse image, Google Lens.

use std::time::Duration;

use async_trait::async_trait;

use super::{checked_text, classify_reqwest_error, BackendError, SearchBackend, SearchInput};
use crate::models::{BackendKind, RawBackendResponse};

pub const SERPAPI_URL: &str = "https://serpapi.com/search.json";

const WEB_LOCATION: &str = "Austin, Texas, United States";

pub struct SerpApiClient {
    client: reqwest::Client,
    kind: BackendKind,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl SerpApiClient {
    fn new(client: reqwest::Client, kind: BackendKind, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            kind,
            endpoint: SERPAPI_URL.to_string(),
            api_key,
            timeout,
        }
    }

    pub fn web(client: reqwest::Client, api_key: Option<String>, timeout: Duration) -> Self {
        Self::new(client, BackendKind::Web, api_key, timeout)
    }

    pub fn reverse_image(client: reqwest::Client, api_key: Option<String>, timeout: Duration) -> Self {
        Self::new(client, BackendKind::ReverseImage, api_key, timeout)
    }

    pub fn lens(client: reqwest::Client, api_key: Option<String>, timeout: Duration) -> Self {
        Self::new(client, BackendKind::VisualLens, api_key, timeout)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Engine-specific query parameters, key excluded.
    fn params<'a>(&self, input: &'a SearchInput) -> Vec<(&'static str, &'a str)> {
        match self.kind {
            BackendKind::Web => vec![
                ("engine", "google"),
                ("q", input.query.as_str()),
                ("location", WEB_LOCATION),
                ("google_domain", "google.com"),
                ("gl", "us"),
                ("hl", "en"),
            ],
            BackendKind::ReverseImage => vec![
                ("engine", "google_reverse_image"),
                ("image_url", input.image_url.as_str()),
            ],
            BackendKind::VisualLens => vec![("engine", "google_lens"), ("url", input.image_url.as_str())],
            BackendKind::Marketplace => Vec::new(),
        }
    }
}

#[async_trait]
impl SearchBackend for SerpApiClient {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn search(&self, input: &SearchInput) -> Result<RawBackendResponse, BackendError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("search API key".into()))?;
        let timeout_secs = self.timeout.as_secs();

        let mut params = self.params(input);
        params.push(("api_key", key));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout_secs))?;

        let body = checked_text(response, timeout_secs).await?;
        let json = serde_json::from_str(&body).map_err(|e| BackendError::Body(e.to_string()))?;
        Ok(RawBackendResponse::Json(json))
    }
}
