//! TTL cache of discovered configuration, keyed by session token.
//!
//! Each session's view of the database (which metadata tables exist,
//! which features they enable) is discovered once by a collaborator and
//! cached here until it ages out or is invalidated. The blob itself is
//! opaque to this crate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sluice_types::config::{HasConfigCacheConfig, defaults};
use sluice_types::connection::{Connection, ConnectionError};

use crate::config::{EvictionPolicy, StoreConfig};
use crate::error::Result;
use crate::store::{ExpiringStore, StoreStats};

/// Opaque configuration blob produced by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredConfig {
    /// The discovered payload, uninterpreted by this crate.
    pub payload: serde_json::Value,

    /// When discovery ran.
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredConfig {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            discovered_at: Utc::now(),
        }
    }
}

/// Collaborator that builds a [`DiscoveredConfig`] by interrogating the
/// database over an existing connection.
#[async_trait]
pub trait ConfigDiscovery: Send + Sync {
    async fn discover(&self, conn: &dyn Connection) -> std::result::Result<DiscoveredConfig, ConnectionError>;
}

/// Configuration for a [`ConfigCache`].
#[derive(Debug, Clone)]
pub struct ConfigCacheConfig {
    /// Absolute age after which a config must be rediscovered.
    pub ttl: Duration,

    /// Safety bound on cached configs (effectively unbounded in practice).
    pub max_entries: usize,
}

impl Default for ConfigCacheConfig {
    fn default() -> Self {
        Self {
            ttl: defaults::discovery_ttl(),
            max_entries: defaults::MAX_DISCOVERY_ENTRIES,
        }
    }
}

impl ConfigCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any configuration provider.
    pub fn from_provider<C: HasConfigCacheConfig>(config: &C) -> Self {
        Self {
            ttl: config.discovery_ttl(),
            max_entries: config.max_discovery_entries(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// TTL-only cache of [`DiscoveredConfig`] per session token.
///
/// Reads do not reorder entries; expiry is the primary removal mechanism
/// and the count bound only exists as a safety net. `put` always
/// overwrites.
pub struct ConfigCache {
    store: ExpiringStore<String, DiscoveredConfig>,
}

impl ConfigCache {
    /// Create a cache with the default policy (15 minute TTL).
    pub fn new() -> Self {
        // Defaults are statically valid.
        Self::with_config(ConfigCacheConfig::default()).expect("default config is valid")
    }

    /// Create a cache with an explicit policy.
    pub fn with_config(config: ConfigCacheConfig) -> Result<Self> {
        let store_config = StoreConfig::new(config.max_entries, config.ttl)
            .with_policy(EvictionPolicy::TtlOnly);
        Ok(Self {
            store: ExpiringStore::new(store_config)?,
        })
    }

    /// Fetch the cached config for a session token.
    pub fn get(&self, token: &str) -> Option<DiscoveredConfig> {
        self.store.get(token)
    }

    /// Cache a config for a session token, replacing any previous one.
    pub fn put(&self, token: impl Into<String>, config: DiscoveredConfig) {
        self.store.put(token.into(), config, 0);
    }

    /// Explicitly drop a session's cached config.
    ///
    /// Alias for removal; used when the session's view of the database is
    /// known to have changed.
    pub fn invalidate(&self, token: &str) -> bool {
        let removed = self.store.remove(token);
        if removed {
            debug!(session = %token, "discovery config invalidated");
        }
        removed
    }

    /// Return the cached config, running discovery on a miss.
    ///
    /// Discovery talks to the database and therefore runs outside the
    /// store lock; only the resulting insert re-enters it.
    pub async fn get_or_discover(
        &self,
        token: &str,
        conn: &dyn Connection,
        discovery: &dyn ConfigDiscovery,
    ) -> std::result::Result<DiscoveredConfig, ConnectionError> {
        if let Some(cached) = self.get(token) {
            debug!(session = %token, "discovery config served from cache");
            return Ok(cached);
        }

        let discovered = discovery.discover(conn).await?;
        self.put(token, discovered.clone());
        debug!(session = %token, "discovery config rebuilt");
        Ok(discovered)
    }

    /// Invalidate and rediscover in one step.
    pub async fn refresh(
        &self,
        token: &str,
        conn: &dyn Connection,
        discovery: &dyn ConfigDiscovery,
    ) -> std::result::Result<DiscoveredConfig, ConnectionError> {
        self.invalidate(token);
        self.get_or_discover(token, conn, discovery).await
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}
