use serde::{Deserialize, Serialize};

use super::backend::BackendKind;

/// Maximum slides in one rendered grid: the reference plus 20 results.
pub const MAX_SLIDES: usize = 21;

/// Maximum extracted results kept per backend.
pub const MAX_RESULTS: usize = MAX_SLIDES - 1;

/// One normalized search result carrying a thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// 0-based ordinal among this backend's extracted results.
    /// Rendered as grid slide `position + 1`; slide 0 is the reference.
    pub position: usize,
    pub thumbnail_url: String,
    pub title: Option<String>,
    /// Detail page link as returned by the backend (may be relative).
    pub detail_link: Option<String>,
    /// Marketplace only.
    pub price: Option<f64>,
    /// Marketplace only.
    pub currency: Option<String>,
    /// The backend's own rank field (`position` / `pos`), informational.
    pub native_rank: Option<u64>,
}

/// A backend's normalized results with the reference image as slide 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailGallery {
    pub backend: BackendKind,
    pub reference_url: String,
    pub items: Vec<GalleryItem>,
    /// Why this gallery is empty, when the backend failed or its payload
    /// could not be parsed.
    pub degraded: Option<String>,
}

impl ThumbnailGallery {
    /// Build a gallery from extracted items, dropping tail items past the
    /// slide cap. The reference is never dropped.
    pub fn assemble(backend: BackendKind, reference_url: &str, mut items: Vec<GalleryItem>) -> Self {
        items.truncate(MAX_RESULTS);
        Self {
            backend,
            reference_url: reference_url.to_string(),
            items,
            degraded: None,
        }
    }

    /// Reference-only gallery for a failed backend.
    pub fn degraded(backend: BackendKind, reference_url: &str, reason: impl Into<String>) -> Self {
        Self {
            backend,
            reference_url: reference_url.to_string(),
            items: Vec::new(),
            degraded: Some(reason.into()),
        }
    }

    pub fn slide_count(&self) -> usize {
        1 + self.items.len()
    }

    /// Slide URLs in grid order, reference first.
    pub fn slide_urls(&self) -> Vec<&str> {
        std::iter::once(self.reference_url.as_str())
            .chain(self.items.iter().map(|item| item.thumbnail_url.as_str()))
            .collect()
    }

    /// Find the item rendered at `slide`. Slide 0 (the reference) and any
    /// slide with no corresponding item yield `None`.
    pub fn item_for_slide(&self, slide: i64) -> Option<&GalleryItem> {
        if slide <= 0 {
            return None;
        }
        let native_position = usize::try_from(slide - 1).ok()?;
        self.items
            .iter()
            .find(|item| item.position == native_position)
    }
}
