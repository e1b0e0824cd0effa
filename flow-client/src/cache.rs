//! Local cache of the last fetched flow configuration.

use std::time::Duration;

use flow_core::FlowConfig;
use serde::{Deserialize, Serialize};

use crate::store::{current_timestamp_ms, ClientStore, CONFIG_CACHE_KEY};
use crate::ClientResult;

/// A cached flow configuration with its fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedConfig {
    /// When the configuration was fetched (ms since epoch).
    pub fetched_at: u64,
    /// The configuration.
    pub config: FlowConfig,
}

impl CachedConfig {
    /// Age of the entry at `now_ms`.
    #[must_use]
    pub fn age(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.fetched_at))
    }

    /// Whether the entry is younger than `ttl` at `now_ms`.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration, now_ms: u64) -> bool {
        self.age(now_ms) < ttl
    }
}

/// Read-through cache of the flow configuration.
#[derive(Debug, Clone)]
pub struct ConfigCache {
    store: ClientStore,
    ttl: Duration,
}

impl ConfigCache {
    /// Create a cache over `store`.
    #[must_use]
    pub fn new(store: ClientStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached entry, fresh or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be read.
    pub fn load(&self) -> ClientResult<Option<CachedConfig>> {
        self.store.get(CONFIG_CACHE_KEY)
    }

    /// Whether an entry is stale right now.
    #[must_use]
    pub fn is_stale(&self, entry: &CachedConfig) -> bool {
        !entry.is_fresh(self.ttl, current_timestamp_ms())
    }

    /// Replace the cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn save(&self, config: &FlowConfig) -> ClientResult<CachedConfig> {
        let entry = CachedConfig {
            fetched_at: current_timestamp_ms(),
            config: config.clone(),
        };
        self.store.put(CONFIG_CACHE_KEY, &entry)?;
        Ok(entry)
    }

    /// Drop the cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be removed.
    pub fn clear(&self) -> ClientResult<()> {
        self.store.remove(CONFIG_CACHE_KEY)
    }
}
