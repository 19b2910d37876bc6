//! Match Resolver: one arbitration call across every uploaded grid, then
//! each backend's chosen slide is looked up in that backend's own gallery.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use url::Url;

use super::arbitration::{parse_arbitration, MatchIndices};
use super::links::build_link;
use crate::models::{BackendKind, MatchState, ResolvedMatch, ThumbnailGallery};
use crate::pipeline::vision::prompts::{arbitration_instructions, ARBITRATE_SYSTEM};
use crate::pipeline::vision::{VisionClient, VisionError};

/// Per-backend outcome of resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResolution {
    pub index: Option<i64>,
    pub state: MatchState,
    pub matched: Option<ResolvedMatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub backends: BTreeMap<BackendKind, BackendResolution>,
    /// False when the reply could not be read, or no grid reached the
    /// model. Such results are not worth caching.
    pub arbitrated: bool,
}

impl Resolution {
    pub fn matches(&self) -> BTreeMap<BackendKind, Option<ResolvedMatch>> {
        self.backends
            .iter()
            .map(|(kind, r)| (*kind, r.matched.clone()))
            .collect()
    }
}

pub struct MatchResolver {
    vision: Arc<dyn VisionClient>,
    marketplace_origin: Url,
}

impl MatchResolver {
    pub fn new(vision: Arc<dyn VisionClient>, marketplace_origin: Url) -> Self {
        Self {
            vision,
            marketplace_origin,
        }
    }

    /// Run both phases. `grid_urls` holds only grids that were uploaded;
    /// backends missing from it are reported as not arbitrated.
    ///
    /// Errors only when the arbitration call itself fails. An unreadable
    /// reply yields no match for every backend.
    pub async fn resolve(
        &self,
        reference_url: &str,
        grid_urls: &BTreeMap<BackendKind, String>,
        galleries: &BTreeMap<BackendKind, ThumbnailGallery>,
    ) -> Result<Resolution, VisionError> {
        if grid_urls.is_empty() {
            tracing::warn!("No grids to arbitrate, every backend left unmatched");
            return Ok(unarbitrated());
        }

        let order: Vec<BackendKind> = grid_urls.keys().copied().collect();
        let raw = match self.arbitrate(reference_url, grid_urls, &order).await {
            Ok(raw) => raw,
            Err(VisionError::ResponseParsing(reason)) => {
                tracing::warn!(error = %reason, "Arbitration reply had no content, treating as no match");
                return Ok(unarbitrated());
            }
            Err(e) => return Err(e),
        };

        match parse_arbitration(&raw, &order) {
            Ok(indices) => Ok(Resolution {
                backends: self.resolve_indices(&indices, galleries),
                arbitrated: true,
            }),
            Err(e) => {
                tracing::warn!(error = %e, reply = %raw, "Malformed arbitration reply, treating as no match");
                Ok(unarbitrated())
            }
        }
    }

    /// Phase 1: the single arbitration call. Images go reference first,
    /// then grids in `order`.
    async fn arbitrate(
        &self,
        reference_url: &str,
        grid_urls: &BTreeMap<BackendKind, String>,
        order: &[BackendKind],
    ) -> Result<String, VisionError> {
        let images: Vec<String> = std::iter::once(reference_url.to_string())
            .chain(order.iter().filter_map(|kind| grid_urls.get(kind).cloned()))
            .collect();
        let instructions = arbitration_instructions(order);

        let start = Instant::now();
        let raw = self
            .vision
            .chat_json(ARBITRATE_SYSTEM, Some(&instructions), &images)
            .await?;
        tracing::info!(
            grids = order.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Arbitration reply received"
        );
        Ok(raw)
    }

    /// Phase 2: pure lookup of each chosen slide in its backend's gallery.
    /// Backends absent from `indices` were never arbitrated.
    pub fn resolve_indices(
        &self,
        indices: &MatchIndices,
        galleries: &BTreeMap<BackendKind, ThumbnailGallery>,
    ) -> BTreeMap<BackendKind, BackendResolution> {
        BackendKind::ALL
            .into_iter()
            .map(|kind| {
                let resolution = match indices.get(&kind) {
                    None => not_arbitrated(),
                    Some(index) => self.resolve_one(kind, *index, galleries.get(&kind)),
                };
                (kind, resolution)
            })
            .collect()
    }

    fn resolve_one(&self, kind: BackendKind, index: Option<i64>, gallery: Option<&ThumbnailGallery>) -> BackendResolution {
        let unmatched = |state| BackendResolution {
            index,
            state,
            matched: None,
        };

        let Some(slide) = index else {
            return unmatched(MatchState::NoMatch);
        };
        if slide <= 0 {
            return unmatched(MatchState::NoMatch);
        }
        let Some(item) = gallery.and_then(|g| g.item_for_slide(slide)) else {
            tracing::warn!(
                backend = %kind,
                index = slide,
                slides = gallery.map(ThumbnailGallery::slide_count).unwrap_or(0),
                "Arbitration index has no matching result"
            );
            return unmatched(MatchState::OutOfRange);
        };

        let matched = ResolvedMatch {
            backend: kind,
            title: item.title.clone(),
            price: item.price,
            currency: item.currency.clone(),
            link: build_link(kind, item.detail_link.as_deref(), &self.marketplace_origin),
            image: item.thumbnail_url.clone(),
            slide: item.position + 1,
        };
        BackendResolution {
            index,
            state: MatchState::Resolved,
            matched: Some(matched),
        }
    }
}

fn unarbitrated() -> Resolution {
    Resolution {
        backends: BackendKind::ALL.into_iter().map(|k| (k, not_arbitrated())).collect(),
        arbitrated: false,
    }
}

fn not_arbitrated() -> BackendResolution {
    BackendResolution {
        index: None,
        state: MatchState::NotArbitrated,
        matched: None,
    }
}
