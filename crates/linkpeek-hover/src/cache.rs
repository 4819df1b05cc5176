//! Client-side preview cache.
//!
//! Keyed by the resolved absolute URL (query included). Entries are never
//! evicted on read; an external scheduler calls [`PreviewCache::sweep_expired`].

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use linkpeek_core::PreviewResult;
use serde::{Deserialize, Serialize};
use url::Url;

/// How long an entry is kept before a sweep removes it.
pub const CACHE_RETENTION: TimeDelta = TimeDelta::hours(24);

/// A cached result and when it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub result: PreviewResult,
    pub cached_at: DateTime<Utc>,
}

/// Preview results by destination URL. Errors are cached like pages.
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: HashMap<String, CacheEntry>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &Url) -> Option<&CacheEntry> {
        self.entries.get(url.as_str())
    }

    /// Store `result` for `url`. Last write wins.
    pub fn insert(&mut self, url: &Url, result: PreviewResult, now: DateTime<Utc>) {
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                result,
                cached_at: now,
            },
        );
    }

    /// All entries, for the expiry collaborator.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove entries older than `retention`. Returns how many were removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>, retention: TimeDelta) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.signed_duration_since(entry.cached_at) <= retention);
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "swept expired previews");
        }
        removed
    }
}
