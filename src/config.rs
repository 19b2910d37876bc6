use std::net::SocketAddr;
use std::time::Duration;

use crate::pipeline::dispatch::scraper::DEFAULT_SCRAPER_URL;
use crate::pipeline::grid::DEFAULT_COLUMNS;
use crate::pipeline::matching::DEFAULT_MARKETPLACE_ORIGIN;
use crate::pipeline::vision::openai::{DEFAULT_VISION_ENDPOINT, DEFAULT_VISION_MODEL};

/// Application-level constants
pub const APP_NAME: &str = "BuySmart";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,buysmart_lib=debug"
}

/// Runtime settings, read once at startup.
///
/// Missing API keys are not an error here: the collaborator that needs the
/// key reports `NotConfigured` when it is first called.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub vision_endpoint: String,
    pub vision_api_key: Option<String>,
    pub vision_api_version: Option<String>,
    pub vision_model: String,
    pub search_api_key: Option<String>,
    pub scraper_auth: Option<String>,
    pub scraper_url: String,
    pub marketplace_origin: String,
    pub image_host_key: Option<String>,
    pub backend_timeout: Duration,
    pub thumbnail_timeout: Duration,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub grid_columns: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secs = |key: &str, default: u64| -> Result<Duration, String> {
            match get(key) {
                Some(v) => v
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| format!("{key}: {e}")),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let bind = get("BUYSMART_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("BUYSMART_BIND: {e}"))?;

        let grid_columns = match get("GRID_COLUMNS") {
            Some(v) => v.parse::<u32>().map_err(|e| format!("GRID_COLUMNS: {e}"))?,
            None => DEFAULT_COLUMNS,
        };
        if grid_columns == 0 {
            return Err("GRID_COLUMNS must be at least 1".into());
        }

        let marketplace_origin = get("MARKETPLACE_ORIGIN").unwrap_or_else(|| DEFAULT_MARKETPLACE_ORIGIN.to_string());
        url::Url::parse(&marketplace_origin).map_err(|e| format!("MARKETPLACE_ORIGIN: {e}"))?;

        Ok(Self {
            bind,
            vision_endpoint: get("VISION_ENDPOINT").unwrap_or_else(|| DEFAULT_VISION_ENDPOINT.to_string()),
            vision_api_key: get("VISION_API_KEY").or_else(|| get("AZURE_KEY")),
            vision_api_version: get("VISION_API_VERSION"),
            vision_model: get("VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            search_api_key: get("GOOGLE_API_KEY"),
            scraper_auth: get("SERP_API_AUTH"),
            scraper_url: get("MARKETPLACE_SCRAPER_URL").unwrap_or_else(|| DEFAULT_SCRAPER_URL.to_string()),
            marketplace_origin,
            image_host_key: get("IMGBB_API_KEY"),
            backend_timeout: secs("BACKEND_TIMEOUT_SECS", 30)?,
            thumbnail_timeout: secs("THUMBNAIL_TIMEOUT_SECS", 10)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", 180)?,
            cache_ttl: secs("CACHE_TTL_SECS", 3600)?,
            grid_columns,
        })
    }

    /// Names of collaborators that will refuse calls for lack of a key.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            ("VISION_API_KEY", self.vision_api_key.is_none()),
            ("GOOGLE_API_KEY", self.search_api_key.is_none()),
            ("SERP_API_AUTH", self.scraper_auth.is_none()),
            ("IMGBB_API_KEY", self.image_host_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, String> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind.to_string(), DEFAULT_BIND);
        assert_eq!(cfg.vision_model, "gpt-4o");
        assert_eq!(cfg.marketplace_origin, "https://www.amazon.com");
        assert_eq!(cfg.backend_timeout, Duration::from_secs(30));
        assert_eq!(cfg.thumbnail_timeout, Duration::from_secs(10));
        assert_eq!(cfg.request_timeout, Duration::from_secs(180));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.grid_columns, 6);
        assert_eq!(cfg.missing_keys().len(), 4);
    }

    #[test]
    fn azure_key_is_a_fallback_for_vision_key() {
        let cfg = config(&[("AZURE_KEY", "az"), ("VISION_API_VERSION", "2024-02-15-preview")]).unwrap();
        assert_eq!(cfg.vision_api_key.as_deref(), Some("az"));
        assert_eq!(cfg.vision_api_version.as_deref(), Some("2024-02-15-preview"));

        let cfg = config(&[("AZURE_KEY", "az"), ("VISION_API_KEY", "direct")]).unwrap();
        assert_eq!(cfg.vision_api_key.as_deref(), Some("direct"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("GOOGLE_API_KEY", "   "), ("CACHE_TTL_SECS", "")]).unwrap();
        assert!(cfg.search_api_key.is_none());
        assert_eq!(cfg.cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(config(&[("BACKEND_TIMEOUT_SECS", "soon")]).unwrap_err().contains("BACKEND_TIMEOUT_SECS"));
        assert!(config(&[("GRID_COLUMNS", "0")]).is_err());
        assert!(config(&[("BUYSMART_BIND", "localhost")]).is_err());
        assert!(config(&[("MARKETPLACE_ORIGIN", "not a url")]).is_err());
    }

    #[test]
    fn app_name_is_buysmart() {
        assert_eq!(APP_NAME, "BuySmart");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
