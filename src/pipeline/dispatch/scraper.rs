//! Marketplace scraper: a hosted scraping API that runs a marketplace search
//! and returns parsed listings. The body is kept as text; the normalizer
//! parses it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{checked_text, classify_reqwest_error, BackendError, SearchBackend, SearchInput};
use crate::models::{BackendKind, RawBackendResponse};

pub const DEFAULT_SCRAPER_URL: &str = "https://scraper-api.smartproxy.com/v2/scrape";

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    target: &'static str,
    query: &'a str,
    page_from: &'static str,
    parse: bool,
}

pub struct MarketplaceScraperClient {
    client: reqwest::Client,
    endpoint: String,
    authorization: Option<String>,
    timeout: Duration,
}

impl MarketplaceScraperClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        authorization: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            authorization,
            timeout,
        }
    }
}

#[async_trait]
impl SearchBackend for MarketplaceScraperClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Marketplace
    }

    async fn search(&self, input: &SearchInput) -> Result<RawBackendResponse, BackendError> {
        let auth = self
            .authorization
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("scraper authorization".into()))?;
        let timeout_secs = self.timeout.as_secs();

        let body = ScrapeRequest {
            target: "amazon_search",
            query: &input.query,
            page_from: "1",
            parse: true,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout_secs))?;

        let text = checked_text(response, timeout_secs).await?;
        Ok(RawBackendResponse::Text(text))
    }
}
