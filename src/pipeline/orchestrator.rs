//! Pipeline Orchestrator.
//!
//! ```text
//! cache check
//!   -> reference hosting (uploads only) -> product description
//!   -> dispatch (4 backends, parallel) -> normalize
//!   -> compose + upload grids (parallel) -> arbitration -> index resolution
//!   -> cache store
//! ```
//!
//! All per-request state lives in a `SearchRequestContext` owned by one call
//! to `Pipeline::run`; nothing is shared between requests except the cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use tracing::Instrument;
use uuid::Uuid;

use super::cache::{cache_key, normalize_text, ResultCache};
use super::dispatch::{BackendError, SearchDispatcher};
use super::grid::{GridCompositor, GridImage};
use super::matching::{MatchResolver, Resolution};
use super::normalize::normalize;
use super::upload::ImageHost;
use super::vision::{describe_product, VisionClient};
use super::PipelineError;
use crate::models::{
    BackendDiagnostics, BackendKind, BackendStatus, MatchState, RawBackendResponse, SearchOutcome,
    ThumbnailGallery,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Where the reference photo comes from.
#[derive(Debug, Clone)]
pub enum ReferenceImage {
    /// Already publicly reachable.
    Url(String),
    /// Raw image bytes; hosted before anything else runs.
    Upload(Vec<u8>),
}

impl ReferenceImage {
    /// Stable identity used for the cache key.
    pub fn identity(&self) -> String {
        match self {
            ReferenceImage::Url(url) => url.trim().to_string(),
            ReferenceImage::Upload(bytes) => format!("upload:{}", hex::encode(Sha256::digest(bytes))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub reference: ReferenceImage,
    pub description: Option<String>,
}

/// A grid that made it to the image host.
#[derive(Debug, Clone)]
pub struct HostedGrid {
    pub grid: GridImage,
    pub url: String,
}

/// Scratch state for one request.
pub struct SearchRequestContext {
    pub request_id: String,
    pub reference_url: String,
    pub query: String,
    pub responses: BTreeMap<BackendKind, Result<RawBackendResponse, BackendError>>,
    pub galleries: BTreeMap<BackendKind, ThumbnailGallery>,
    pub grids: BTreeMap<BackendKind, Result<HostedGrid, String>>,
}

impl SearchRequestContext {
    fn new(request_id: String, reference_url: String, query: String) -> Self {
        Self {
            request_id,
            reference_url,
            query,
            responses: BTreeMap::new(),
            galleries: BTreeMap::new(),
            grids: BTreeMap::new(),
        }
    }

    /// Turn every dispatch result into a gallery. Failed backends get a
    /// reference-only gallery.
    fn normalize_all(&mut self) {
        self.galleries = self
            .responses
            .iter()
            .map(|(kind, response)| {
                let gallery = match response {
                    Ok(raw) => normalize(*kind, raw, &self.reference_url),
                    Err(e) => ThumbnailGallery::degraded(*kind, &self.reference_url, e.to_string()),
                };
                (*kind, gallery)
            })
            .collect();
    }

    fn grid_urls(&self) -> BTreeMap<BackendKind, String> {
        self.grids
            .iter()
            .filter_map(|(kind, grid)| grid.as_ref().ok().map(|g| (*kind, g.url.clone())))
            .collect()
    }

    fn diagnostics(&self, resolution: &Resolution) -> Vec<BackendDiagnostics> {
        BackendKind::ALL
            .into_iter()
            .map(|kind| {
                let gallery = self.galleries.get(&kind);
                let status = match (self.responses.get(&kind), gallery.and_then(|g| g.degraded.clone())) {
                    (Some(Err(e)), _) => BackendStatus::Unavailable { reason: e.to_string() },
                    (None, _) => BackendStatus::Unavailable {
                        reason: "not dispatched".into(),
                    },
                    (Some(Ok(_)), Some(reason)) => BackendStatus::Unparseable { reason },
                    (Some(Ok(_)), None) => BackendStatus::Ok,
                };
                let hosted = self.grids.get(&kind).and_then(|g| g.as_ref().ok());
                let resolved = resolution.backends.get(&kind);

                BackendDiagnostics {
                    backend: kind,
                    status,
                    items: gallery.map(|g| g.items.len()).unwrap_or(0),
                    slides: hosted
                        .map(|h| h.grid.slides)
                        .or_else(|| gallery.map(ThumbnailGallery::slide_count))
                        .unwrap_or(1),
                    placeholders: hosted.map(|h| h.grid.placeholders).unwrap_or(0),
                    match_index: resolved.and_then(|r| r.index),
                    match_state: resolved.map(|r| r.state).unwrap_or(MatchState::NotArbitrated),
                }
            })
            .collect()
    }
}

pub struct Pipeline {
    dispatcher: SearchDispatcher,
    compositor: GridCompositor,
    resolver: MatchResolver,
    vision: Arc<dyn VisionClient>,
    host: Arc<dyn ImageHost>,
    cache: Arc<ResultCache>,
    request_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        dispatcher: SearchDispatcher,
        compositor: GridCompositor,
        resolver: MatchResolver,
        vision: Arc<dyn VisionClient>,
        host: Arc<dyn ImageHost>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            dispatcher,
            compositor,
            resolver,
            vision,
            host,
            cache,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Serve from cache or run the whole pipeline under the request timeout.
    pub async fn run(&self, request: SearchRequest) -> Result<SearchOutcome, PipelineError> {
        let key = cache_key(&request.reference.identity(), request.description.as_deref());
        if let Some(mut hit) = self.cache.get(&key) {
            tracing::info!(key = %key, request_id = %hit.request_id, "Serving cached search result");
            hit.cached = true;
            return Ok(hit);
        }

        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("search", request_id = %request_id);
        match tokio::time::timeout(self.request_timeout, self.execute(request_id, request, &key))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = self.request_timeout.as_secs(), "Search request timed out");
                Err(PipelineError::Timeout(self.request_timeout.as_secs()))
            }
        }
    }

    async fn execute(
        &self,
        request_id: String,
        request: SearchRequest,
        key: &str,
    ) -> Result<SearchOutcome, PipelineError> {
        let start = Instant::now();

        let reference_url = match request.reference {
            ReferenceImage::Url(url) => url.trim().to_string(),
            ReferenceImage::Upload(bytes) => self.host.upload(&bytes).await.map_err(PipelineError::Upload)?,
        };

        let described = describe_product(self.vision.as_ref(), &reference_url, request.description.as_deref())
            .await
            .map_err(PipelineError::Description)?;
        let query = resolve_query(&described.query, request.description.as_deref())?;

        let mut ctx = SearchRequestContext::new(request_id, reference_url, query);

        ctx.responses = self.dispatcher.dispatch(&ctx.query, &ctx.reference_url).await;
        ctx.normalize_all();
        ctx.grids = self.compose_and_host(&ctx.galleries).await;

        let resolution = self
            .resolver
            .resolve(&ctx.reference_url, &ctx.grid_urls(), &ctx.galleries)
            .await
            .map_err(PipelineError::Arbitration)?;

        let outcome = SearchOutcome {
            request_id: ctx.request_id.clone(),
            query: ctx.query.clone(),
            original_image: ctx.reference_url.clone(),
            matches: resolution.matches(),
            diagnostics: ctx.diagnostics(&resolution),
            cached: false,
            completed_at: chrono::Utc::now().to_rfc3339(),
        };

        if resolution.arbitrated {
            self.cache.insert_if_absent(key, &outcome);
        }

        tracing::info!(
            resolved = outcome.resolved_count(),
            arbitrated = resolution.arbitrated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(outcome)
    }

    /// Compose and upload every gallery's grid concurrently. A grid that
    /// fails here only takes its own backend out of arbitration.
    async fn compose_and_host(
        &self,
        galleries: &BTreeMap<BackendKind, ThumbnailGallery>,
    ) -> BTreeMap<BackendKind, Result<HostedGrid, String>> {
        let jobs = galleries.iter().map(|(kind, gallery)| async move {
            let hosted = async {
                let grid = self.compositor.compose(gallery).await.map_err(|e| e.to_string())?;
                let url = self.host.upload(&grid.bytes).await.map_err(|e| e.to_string())?;
                Ok::<_, String>(HostedGrid { grid, url })
            }
            .await;
            if let Err(reason) = &hosted {
                tracing::warn!(backend = %kind, error = %reason, "Grid unavailable, backend skipped in arbitration");
            }
            (*kind, hosted)
        });
        join_all(jobs).await.into_iter().collect()
    }
}

/// The model's query, or the user's own description when the model gave
/// nothing usable.
fn resolve_query(model_query: &str, user_description: Option<&str>) -> Result<String, PipelineError> {
    let query = model_query.trim();
    if !query.is_empty() {
        return Ok(query.to_string());
    }
    let fallback = normalize_text(user_description.unwrap_or_default());
    if fallback.is_empty() {
        return Err(PipelineError::EmptyQuery);
    }
    tracing::warn!(query = %fallback, "Model returned no query, using the user's description");
    Ok(fallback)
}
