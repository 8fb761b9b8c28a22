//! Catalog cache in local storage.
//!
//! Each platform's catalog is stored under two keys:
//!
//! ```text
//! {prefix}{platform}            JSON array of item summaries
//! {prefix}{platform}_timestamp  write time, milliseconds since the epoch
//! ```
//!
//! with `prefix` = `games_cache_` or `combos_cache_`. An entry older than the
//! catalog's TTL is removed on the read that finds it stale. The cache never
//! fails: storage and parse errors are logged and read as a miss.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use zona_gamer_core::{ItemKind, Platform};

use crate::clock::Clock;
use crate::models::ItemSummary;
use crate::storage::LocalStorage;

const TIMESTAMP_SUFFIX: &str = "_timestamp";

/// TTL cache of one catalog (games or combos), keyed by platform.
#[derive(Clone)]
pub struct CatalogCache {
    storage: Arc<dyn LocalStorage>,
    clock: Arc<dyn Clock>,
    kind: ItemKind,
    ttl: Duration,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("kind", &self.kind)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        clock: Arc<dyn Clock>,
        kind: ItemKind,
        ttl: Duration,
    ) -> Self {
        Self {
            storage,
            clock,
            kind,
            ttl,
        }
    }

    fn data_key(&self, platform: Platform) -> String {
        format!("{}{platform}", self.kind.cache_prefix())
    }

    fn timestamp_key(&self, platform: Platform) -> String {
        format!("{}{TIMESTAMP_SUFFIX}", self.data_key(platform))
    }

    /// Cached catalog of `platform`, if present and not older than the TTL.
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<Vec<ItemSummary>> {
        let data_key = self.data_key(platform);
        let timestamp_key = self.timestamp_key(platform);

        let data = self.read(&data_key)?;
        let stored_at = self.read(&timestamp_key)?;

        let Ok(stored_at) = stored_at.trim().parse::<i64>() else {
            warn!(key = %timestamp_key, "Unreadable cache timestamp, discarding entry");
            self.remove_pair(platform);
            return None;
        };

        let age_ms = self.clock.now_millis().saturating_sub(stored_at);
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if age_ms > ttl_ms {
            debug!(key = %data_key, age_ms, ttl_ms, "Cache entry expired");
            self.remove_pair(platform);
            return None;
        }

        match serde_json::from_str(&data) {
            Ok(items) => {
                debug!(key = %data_key, age_ms, "Cache hit");
                Some(items)
            }
            Err(e) => {
                warn!(key = %data_key, error = %e, "Unreadable cache entry, treating as miss");
                None
            }
        }
    }

    /// Store the catalog of `platform`, stamped with the current time.
    pub fn set(&self, platform: Platform, items: &[ItemSummary]) {
        let data = match serde_json::to_string(items) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Failed to serialize catalog for cache");
                return;
            }
        };

        let data_key = self.data_key(platform);
        if let Err(e) = self.storage.set_item(&data_key, &data) {
            warn!(key = %data_key, error = %e, "Failed to write cache entry");
            return;
        }

        let timestamp_key = self.timestamp_key(platform);
        let now = self.clock.now_millis().to_string();
        if let Err(e) = self.storage.set_item(&timestamp_key, &now) {
            warn!(key = %timestamp_key, error = %e, "Failed to write cache timestamp");
        }
    }

    /// Remove the entry of one platform, or of every platform when `None`.
    pub fn clear(&self, platform: Option<Platform>) {
        if let Some(platform) = platform {
            self.remove_pair(platform);
            return;
        }

        let prefix = self.kind.cache_prefix();
        match self.storage.keys() {
            Ok(keys) => {
                for key in keys.iter().filter(|k| k.starts_with(prefix)) {
                    self.remove(key);
                }
            }
            Err(e) => warn!(prefix, error = %e, "Failed to list cache keys"),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).unwrap_or_else(|e| {
            warn!(key, error = %e, "Failed to read cache entry");
            None
        })
    }

    fn remove_pair(&self, platform: Platform) {
        self.remove(&self.data_key(platform));
        self.remove(&self.timestamp_key(platform));
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(key) {
            warn!(key, error = %e, "Failed to remove cache entry");
        }
    }
}
