//! Bounded expiring stores for the Sluice query broker.
//!
//! Everything that caches in the broker specializes one abstraction:
//! [`ExpiringStore`], a thread-safe map with lazy TTL expiry and
//! count/byte-budget eviction under a pluggable recency policy.
//!
//! - [`ResultCache`] — per-session query results (LRU + TTL + byte budget)
//! - [`ConfigCache`] — discovered configuration per session token
//!   (TTL-only, discover-on-miss)
//!
//! Misses are never errors: an absent or expired entry just signals
//! "recompute". The only error path is an invalid configuration, which
//! fails fast at construction.

mod config;
mod config_cache;
mod error;
mod result_cache;
mod store;

pub use config::{EvictionPolicy, StoreConfig};
pub use config_cache::{ConfigCache, ConfigCacheConfig, ConfigDiscovery, DiscoveredConfig};
pub use error::{Error, Result};
pub use result_cache::{ResultCache, ResultCacheConfig};
pub use store::{CacheEntry, ExpiringStore, StoreStats};
