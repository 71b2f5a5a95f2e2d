//! Per-session bounded cache of computed query results.

use std::time::Duration;

use tracing::trace;

use sluice_types::config::{HasResultCacheConfig, defaults};
use sluice_types::result::QueryResult;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::store::{ExpiringStore, StoreStats};

/// Configuration for a [`ResultCache`].
#[derive(Debug, Clone)]
pub struct ResultCacheConfig {
    /// Maximum number of cached results.
    pub max_results: usize,

    /// Absolute age after which a result is treated as absent.
    pub ttl: Duration,

    /// Aggregate byte budget (`None` = unbounded).
    pub max_bytes: Option<u64>,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            max_results: defaults::MAX_RESULTS_PER_SESSION,
            ttl: defaults::result_ttl(),
            max_bytes: Some(defaults::MAX_RESULT_BYTES),
        }
    }
}

impl ResultCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any configuration provider.
    pub fn from_provider<C: HasResultCacheConfig>(config: &C) -> Self {
        Self {
            max_results: config.max_results(),
            ttl: config.result_ttl(),
            max_bytes: config.max_result_bytes(),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new(self.max_results, self.ttl);
        if let Some(max_bytes) = self.max_bytes {
            config = config.with_max_bytes(max_bytes);
        }
        config
    }

    /// Fail fast on parameters that indicate a caller bug.
    pub fn validate(&self) -> Result<()> {
        self.store_config().validate()
    }
}

/// LRU + TTL + byte-budget cache of [`QueryResult`]s, one per session.
///
/// The byte charge for each result is its own deterministic size
/// estimate. A result larger than the entire budget is still admitted —
/// it evicts everything else and becomes the sole occupant, because the
/// cache never silently drops a write on account of its own budget.
pub struct ResultCache {
    store: ExpiringStore<String, QueryResult>,
}

impl ResultCache {
    /// Create a cache with the default policy (50 results, 5 minute TTL,
    /// 10 MiB budget).
    pub fn new() -> Self {
        // Defaults are statically valid.
        Self::with_config(ResultCacheConfig::default()).expect("default config is valid")
    }

    /// Create a cache with an explicit policy.
    pub fn with_config(config: ResultCacheConfig) -> Result<Self> {
        Ok(Self {
            store: ExpiringStore::new(config.store_config())?,
        })
    }

    /// Store a result under its query id, evicting as needed.
    pub fn put(&self, query_id: impl Into<String>, result: QueryResult) {
        let query_id = query_id.into();
        let size = result.estimated_size();
        trace!(query_id = %query_id, size_bytes = size, "caching query result");
        self.store.put(query_id, result, size);
    }

    /// Fetch a result by query id. `None` means recompute.
    pub fn get(&self, query_id: &str) -> Option<QueryResult> {
        self.store.get(query_id)
    }

    /// Drop a single result.
    pub fn remove(&self, query_id: &str) -> bool {
        self.store.remove(query_id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop everything; called when the owning session is torn down.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Occupancy statistics for session summaries.
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_types::result::Column;

    fn result_with_rows(n: usize) -> QueryResult {
        QueryResult::succeeded(
            vec![Column::new("ID", "NUMBER")],
            (0..n).map(|i| vec![json!(i)]).collect(),
        )
    }

    #[test]
    fn test_put_get_roundtrip() {
        let cache = ResultCache::new();
        cache.put("q1", result_with_rows(3));

        let fetched = cache.get("q1").unwrap();
        assert_eq!(fetched.row_count(), 3);
        assert!(cache.get("q2").is_none());
    }

    #[test]
    fn test_failed_result_cached_like_any_other() {
        let cache = ResultCache::new();
        cache.put("q1", QueryResult::failed("relation does not exist"));

        assert!(cache.get("q1").unwrap().is_failed());
    }

    #[test]
    fn test_count_bound() {
        let cache = ResultCache::with_config(
            ResultCacheConfig::new()
                .with_max_results(2)
                .with_max_bytes(None),
        )
        .unwrap();

        cache.put("q1", result_with_rows(1));
        cache.put("q2", result_with_rows(1));
        cache.put("q3", result_with_rows(1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("q1").is_none());
        assert!(cache.get("q3").is_some());
    }

    #[test]
    fn test_byte_budget_uses_result_size_estimate() {
        let small = result_with_rows(2);
        let budget = small.estimated_size() + 10;
        let cache =
            ResultCache::with_config(ResultCacheConfig::new().with_max_bytes(Some(budget)))
                .unwrap();

        cache.put("q1", small);
        cache.put("q2", result_with_rows(2));

        // Both together exceed the budget, so q1 was evicted.
        assert!(cache.get("q1").is_none());
        assert!(cache.get("q2").is_some());
        assert!(cache.stats().total_bytes <= budget);
    }

    #[test]
    fn test_oversized_result_admitted_alone() {
        let cache =
            ResultCache::with_config(ResultCacheConfig::new().with_max_bytes(Some(64))).unwrap();
        cache.put("q1", result_with_rows(1));

        let big = result_with_rows(100);
        assert!(big.estimated_size() > 64);
        cache.put("big", big);

        assert_eq!(cache.len(), 1);
        assert!(cache.get("big").is_some());
    }

    #[test]
    fn test_clear_for_teardown() {
        let cache = ResultCache::new();
        cache.put("q1", result_with_rows(1));
        cache.put("q2", result_with_rows(1));

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().total_bytes, 0);
    }

    #[test]
    fn test_stats_shape() {
        let cache = ResultCache::new();
        cache.put("q1", result_with_rows(1));

        let stats = cache.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.max_count, defaults::MAX_RESULTS_PER_SESSION);
        assert_eq!(stats.max_bytes, Some(defaults::MAX_RESULT_BYTES));
        assert!(stats.total_bytes > 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ResultCache::with_config(ResultCacheConfig::new().with_max_results(0)).is_err());
        assert!(
            ResultCache::with_config(ResultCacheConfig::new().with_ttl(Duration::ZERO)).is_err()
        );
    }
}
