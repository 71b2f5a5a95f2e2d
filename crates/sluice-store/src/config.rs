//! Configuration for expiring stores.

use std::time::Duration;

use crate::error::{Error, Result};

/// How a store orders entries for capacity eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Reads refresh recency; capacity eviction removes the least
    /// recently used entry (ties broken by insertion order).
    Lru,
    /// Reads do not reorder; capacity eviction removes the oldest
    /// insertion. Expiry is the primary removal mechanism.
    TtlOnly,
}

/// Policy parameters for an [`ExpiringStore`](crate::ExpiringStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of entries (must be at least 1).
    pub max_count: usize,

    /// Absolute age after which an entry is treated as absent
    /// (must be non-zero).
    pub ttl: Duration,

    /// Aggregate byte budget across all entries (`None` = unbounded).
    pub max_bytes: Option<u64>,

    /// Recency policy for capacity eviction.
    pub policy: EvictionPolicy,
}

impl StoreConfig {
    /// Create a configuration with the given count bound and TTL,
    /// LRU policy, and no byte budget.
    pub fn new(max_count: usize, ttl: Duration) -> Self {
        Self {
            max_count,
            ttl,
            max_bytes: None,
            policy: EvictionPolicy::Lru,
        }
    }

    /// Set the aggregate byte budget.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Set the eviction policy.
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fail fast on parameters that indicate a caller bug.
    pub fn validate(&self) -> Result<()> {
        if self.max_count == 0 {
            return Err(Error::InvalidConfig("max_count must be at least 1"));
        }
        if self.ttl.is_zero() {
            return Err(Error::InvalidConfig("ttl must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StoreConfig::new(10, Duration::from_secs(60))
            .with_max_bytes(4096)
            .with_policy(EvictionPolicy::TtlOnly);
        assert_eq!(config.max_count, 10);
        assert_eq!(config.max_bytes, Some(4096));
        assert_eq!(config.policy, EvictionPolicy::TtlOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_count_rejected() {
        let config = StoreConfig::new(0, Duration::from_secs(60));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = StoreConfig::new(10, Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
