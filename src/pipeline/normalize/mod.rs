//! Gallery normalizer: turns each backend's own response shape into a
//! uniform thumbnail gallery.
//!
//! Pure and I/O free. A payload that cannot be read yields a reference-only
//! gallery with `degraded` set; it never fails the request.

pub mod marketplace;
pub mod serp;

use thiserror::Error;

use crate::models::{BackendKind, RawBackendResponse, ThumbnailGallery};

/// Why a backend payload could not be turned into gallery items.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("payload is not JSON: {0}")]
    InvalidJson(String),

    #[error("missing key '{0}'")]
    MissingKey(String),

    #[error("'{0}' is not a list")]
    NotAList(String),
}

/// Normalize one backend's raw response into its gallery.
pub fn normalize(
    backend: BackendKind,
    raw: &RawBackendResponse,
    reference_url: &str,
) -> ThumbnailGallery {
    let extracted = raw
        .to_json()
        .map_err(|e| NormalizeError::InvalidJson(e.to_string()))
        .and_then(|json| match backend {
            BackendKind::Marketplace => marketplace::extract(&json),
            BackendKind::Web => serp::extract(&json, serp::WEB_RESULTS_KEY),
            BackendKind::ReverseImage => serp::extract(&json, serp::REVERSE_IMAGE_RESULTS_KEY),
            BackendKind::VisualLens => serp::extract(&json, serp::LENS_RESULTS_KEY),
        });

    match extracted {
        Ok(items) => {
            let found = items.len();
            let gallery = ThumbnailGallery::assemble(backend, reference_url, items);
            tracing::debug!(
                backend = %backend,
                found,
                kept = gallery.items.len(),
                "Gallery normalized"
            );
            gallery
        }
        Err(e) => {
            tracing::warn!(backend = %backend, error = %e, "Backend payload unreadable, using empty gallery");
            ThumbnailGallery::degraded(backend, reference_url, e.to_string())
        }
    }
}

/// Read an optional string field, treating empty strings as absent.
pub(crate) fn str_field(obj: &serde_json::Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn rank_field(obj: &serde_json::Value, key: &str) -> Option<u64> {
    obj.get(key).and_then(serde_json::Value::as_u64)
}
