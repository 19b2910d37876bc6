use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::backend::BackendKind;

/// The best-matching result for one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    pub backend: BackendKind,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub currency: Option<String>,
    /// Absolute detail page link.
    pub link: Option<String>,
    /// Thumbnail URL of the matched result.
    pub image: String,
    /// Grid slide the arbitration step picked.
    pub slide: usize,
}

/// How a backend's search went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BackendStatus {
    Ok,
    /// Dispatch failed (timeout, HTTP error, unconfigured).
    Unavailable { reason: String },
    /// Payload arrived but did not have the expected shape.
    Unparseable { reason: String },
}

/// How the arbitration answer for a backend was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    Resolved,
    /// Index 0 (the reference) or a missing / non-integer answer.
    NoMatch,
    /// Index points past the gallery's results.
    OutOfRange,
    /// Grid never reached arbitration (upload failed) or the answer was malformed.
    NotArbitrated,
}

/// Per-backend counters surfaced with every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDiagnostics {
    pub backend: BackendKind,
    pub status: BackendStatus,
    /// Results extracted (after the slide cap).
    pub items: usize,
    /// Slides rendered, reference included.
    pub slides: usize,
    /// Slides rendered as placeholder tiles.
    pub placeholders: usize,
    pub match_index: Option<i64>,
    pub match_state: MatchState,
}

/// Final answer for one search request. This is what gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub request_id: String,
    pub query: String,
    pub original_image: String,
    /// Every backend appears; `None` means no confident match.
    pub matches: BTreeMap<BackendKind, Option<ResolvedMatch>>,
    pub diagnostics: Vec<BackendDiagnostics>,
    /// True when this outcome was served from the result cache.
    #[serde(default)]
    pub cached: bool,
    pub completed_at: String,
}

impl SearchOutcome {
    pub fn resolved_count(&self) -> usize {
        self.matches.values().filter(|m| m.is_some()).count()
    }

    pub fn match_for(&self, backend: BackendKind) -> Option<&ResolvedMatch> {
        self.matches.get(&backend).and_then(Option::as_ref)
    }
}
