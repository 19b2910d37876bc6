//! Shared application state.
//!
//! `CoreState` owns the configured pipeline and every collaborator client
//! behind it. Built once at startup and shared with the HTTP layer as
//! `Arc<CoreState>`.

use std::sync::Arc;

use url::Url;

use crate::config::{self, AppConfig};
use crate::pipeline::cache::ResultCache;
use crate::pipeline::dispatch::{
    MarketplaceScraperClient, SearchBackend, SearchDispatcher, SerpApiClient,
};
use crate::pipeline::grid::{GridCompositor, ThumbnailFetcher};
use crate::pipeline::matching::MatchResolver;
use crate::pipeline::upload::{ImageHost, ImgbbHost};
use crate::pipeline::vision::{OpenAiVisionClient, VisionClient};
use crate::pipeline::Pipeline;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    pipeline: Pipeline,
}

impl CoreState {
    /// Wire production clients from configuration.
    ///
    /// One `reqwest::Client` is shared by every collaborator so that
    /// connection pools are reused across backends.
    pub fn from_config(config: AppConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", config::APP_NAME, config::APP_VERSION))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        let origin = Url::parse(&config.marketplace_origin)
            .map_err(|e| format!("Invalid marketplace origin: {e}"))?;

        let backends: Vec<Arc<dyn SearchBackend>> = vec![
            Arc::new(MarketplaceScraperClient::new(
                client.clone(),
                &config.scraper_url,
                config.scraper_auth.clone(),
                config.backend_timeout,
            )),
            Arc::new(SerpApiClient::web(client.clone(), config.search_api_key.clone(), config.backend_timeout)),
            Arc::new(SerpApiClient::reverse_image(
                client.clone(),
                config.search_api_key.clone(),
                config.backend_timeout,
            )),
            Arc::new(SerpApiClient::lens(client.clone(), config.search_api_key.clone(), config.backend_timeout)),
        ];

        let vision: Arc<dyn VisionClient> = Arc::new(OpenAiVisionClient::new(
            client.clone(),
            &config.vision_endpoint,
            config.vision_api_key.clone(),
            config.vision_api_version.clone(),
            &config.vision_model,
            config.request_timeout,
        ));
        let host: Arc<dyn ImageHost> = Arc::new(ImgbbHost::new(
            client.clone(),
            config.image_host_key.clone(),
            config.backend_timeout,
        ));

        let pipeline = Pipeline::new(
            SearchDispatcher::new(backends, config.backend_timeout),
            GridCompositor::new(ThumbnailFetcher::new(client, config.thumbnail_timeout), config.grid_columns),
            MatchResolver::new(vision.clone(), origin),
            vision,
            host,
            Arc::new(ResultCache::new(config.cache_ttl)),
        )
        .with_request_timeout(config.request_timeout);

        for key in config.missing_keys() {
            tracing::warn!(key, "Not configured; dependent calls will fail");
        }

        Ok(Self { config, pipeline })
    }

    /// Assemble from a pre-built pipeline (tests, alternate wiring).
    pub fn with_pipeline(config: AppConfig, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn cache_entries(&self) -> u64 {
        self.pipeline.cache().entry_count()
    }
}
