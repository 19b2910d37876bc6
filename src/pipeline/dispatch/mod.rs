//! Search Dispatcher.
//!
//! One call per backend, all in flight at once. Text backends get the
//! derived query, image backends get the hosted reference URL. Each backend
//! fails on its own: a timeout or HTTP error is recorded for that backend
//! and the others carry on. No retries happen here.

pub mod scraper;
pub mod serpapi;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use thiserror::Error;
use tracing::Instrument;

use crate::models::{BackendKind, QueryContract, RawBackendResponse};

pub use scraper::MarketplaceScraperClient;
pub use serpapi::SerpApiClient;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable body: {0}")]
    Body(String),
}

/// Both query forms; each backend reads the one its contract names.
#[derive(Debug, Clone)]
pub struct SearchInput {
    pub query: String,
    pub image_url: String,
}

impl SearchInput {
    pub fn for_contract(&self, contract: QueryContract) -> &str {
        match contract {
            QueryContract::Text => &self.query,
            QueryContract::Image => &self.image_url,
        }
    }
}

/// One external search engine.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn search(&self, input: &SearchInput) -> Result<RawBackendResponse, BackendError>;
}

pub type DispatchResults = BTreeMap<BackendKind, Result<RawBackendResponse, BackendError>>;

#[derive(Clone)]
pub struct SearchDispatcher {
    backends: BTreeMap<BackendKind, Arc<dyn SearchBackend>>,
    timeout: Duration,
}

impl SearchDispatcher {
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>, timeout: Duration) -> Self {
        let backends = backends.into_iter().map(|b| (b.kind(), b)).collect();
        Self { backends, timeout }
    }

    /// Query every backend concurrently. Every `BackendKind` gets an entry;
    /// a kind with no registered backend reports `NotConfigured`.
    pub async fn dispatch(&self, query: &str, image_url: &str) -> DispatchResults {
        let input = SearchInput {
            query: query.to_string(),
            image_url: image_url.to_string(),
        };

        let calls = BackendKind::ALL.into_iter().map(|kind| {
            let input = &input;
            let span = tracing::info_span!("dispatch", backend = %kind);
            async move { (kind, self.dispatch_one(kind, input).await) }.instrument(span)
        });

        join_all(calls).await.into_iter().collect()
    }

    async fn dispatch_one(
        &self,
        kind: BackendKind,
        input: &SearchInput,
    ) -> Result<RawBackendResponse, BackendError> {
        let backend = self
            .backends
            .get(&kind)
            .ok_or_else(|| BackendError::NotConfigured(kind.label().to_string()))?;

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, backend.search(input)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout.as_secs())),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(raw) => tracing::info!(
                backend = %kind,
                elapsed_ms,
                text_bytes = raw.len_hint(),
                status = "ok",
                "Backend search complete"
            ),
            Err(e) => tracing::warn!(
                backend = %kind,
                elapsed_ms,
                error = %e,
                "Backend search failed, continuing without it"
            ),
        }
        result
    }
}

/// Map a reqwest failure onto the backend taxonomy.
pub(crate) fn classify_reqwest_error(e: reqwest::Error, timeout_secs: u64) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(timeout_secs)
    } else if e.is_decode() || e.is_body() {
        BackendError::Body(e.to_string())
    } else {
        BackendError::Network(e.to_string())
    }
}

/// Read a response, turning non-2xx into `Status`.
pub(crate) async fn checked_text(response: reqwest::Response, timeout_secs: u64) -> Result<String, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(e, timeout_secs))?;
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: truncate_body(body),
        });
    }
    Ok(body)
}

fn truncate_body(mut body: String) -> String {
    const MAX: usize = 512;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

/// Mock search backend for testing: scripted response, optional delay,
/// records the inputs it received.
pub struct MockSearchBackend {
    kind: BackendKind,
    response: Result<RawBackendResponse, BackendError>,
    delay: Duration,
    received: Mutex<Vec<String>>,
}

impl MockSearchBackend {
    pub fn new(kind: BackendKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            response: Ok(RawBackendResponse::Json(payload)),
            delay: Duration::ZERO,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn text(kind: BackendKind, body: &str) -> Self {
        Self {
            response: Ok(RawBackendResponse::Text(body.to_string())),
            ..Self::new(kind, serde_json::Value::Null)
        }
    }

    pub fn failing(kind: BackendKind, error: BackendError) -> Self {
        Self {
            response: Err(error),
            ..Self::new(kind, serde_json::Value::Null)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Query strings or image URLs this backend was called with.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn search(&self, input: &SearchInput) -> Result<RawBackendResponse, BackendError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(input.for_contract(self.kind.contract()).to_string());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.clone()
    }
}
