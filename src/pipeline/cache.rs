//! Process-wide result cache.
//!
//! Values are serialized `SearchOutcome`s with a fixed time-to-live. The
//! cache is advisory: a miss just recomputes. Concurrent writers for the
//! same key race; the first one stored stays until it expires.

use std::sync::Mutex;
use std::time::Duration;

use mini_moka::sync::Cache;
use sha2::{Digest, Sha256};

use crate::models::SearchOutcome;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const MAX_ENTRIES: u64 = 10_000;
const KEY_PREFIX: &str = "search:";

/// Lowercase and collapse whitespace runs to single spaces.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic key for a reference image plus optional description.
pub fn cache_key(reference_url: &str, description: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(reference_url.trim().as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_text(description.unwrap_or_default()).as_bytes());
    format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize()))
}

pub struct ResultCache {
    entries: Cache<String, String>,
    write_lock: Mutex<()>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_ENTRIES)
                .build(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn get(&self, key: &str) -> Option<SearchOutcome> {
        let serialized = self.entries.get(&key.to_string())?;
        match serde_json::from_str(&serialized) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Dropping unreadable cache entry");
                self.entries.invalidate(&key.to_string());
                None
            }
        }
    }

    /// Store `outcome` unless a live entry already exists. Returns whether
    /// this call stored it.
    pub fn insert_if_absent(&self, key: &str, outcome: &SearchOutcome) -> bool {
        let serialized = match serde_json::to_string(outcome) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Outcome not cacheable");
                return false;
            }
        };

        let Ok(_guard) = self.write_lock.lock() else {
            return false;
        };
        let key = key.to_string();
        if self.entries.get(&key).is_some() {
            tracing::debug!(key = %key, "Cache entry already present, keeping first");
            return false;
        }
        self.entries.insert(key, serialized);
        true
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
