//! Configuration traits for decoupled config passing between crates.
//!
//! These traits let a component depend on the configuration capability it
//! needs without knowing the full configuration structure of the embedding
//! service. Each trait represents one capability; the standalone
//! [`BrokerConfigProvider`] bundles them for callers that want a single
//! config object.

use std::time::Duration;

/// Base trait for all configuration types.
///
/// Implementations should be cheaply cloneable and thread-safe.
pub trait ConfigProvider: Clone + Send + Sync + 'static {}

/// Per-session result cache configuration.
pub trait HasResultCacheConfig: ConfigProvider {
    /// Maximum number of cached query results per session.
    fn max_results(&self) -> usize;

    /// Absolute age after which a cached result is treated as absent.
    fn result_ttl(&self) -> Duration;

    /// Aggregate byte budget per session cache (`None` = unbounded).
    fn max_result_bytes(&self) -> Option<u64> {
        Some(defaults::MAX_RESULT_BYTES)
    }
}

/// Discovery-config cache configuration.
pub trait HasConfigCacheConfig: ConfigProvider {
    /// Absolute age after which a discovered config must be rebuilt.
    fn discovery_ttl(&self) -> Duration;

    /// Safety bound on the number of cached configs.
    fn max_discovery_entries(&self) -> usize {
        defaults::MAX_DISCOVERY_ENTRIES
    }
}

/// Connect-path rate limiting configuration.
pub trait HasRateLimitConfig: ConfigProvider {
    /// Attempts allowed per client key within one window.
    fn max_attempts(&self) -> u32;

    /// Length of the sliding window.
    fn attempt_window(&self) -> Duration;
}

/// Session registry configuration.
pub trait HasRegistryConfig: ConfigProvider {
    /// Idle time after which a session is reclaimed.
    fn idle_timeout(&self) -> Duration;

    /// Interval between background reaper sweeps.
    fn reap_interval(&self) -> Duration {
        defaults::reap_interval()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default configuration values shared across the workspace.
pub mod defaults {
    use std::time::Duration;

    pub const MAX_RESULTS_PER_SESSION: usize = 50;
    pub const RESULT_TTL_SECS: u64 = 300;
    /// 10 MiB aggregate budget per session cache.
    pub const MAX_RESULT_BYTES: u64 = 10 * 1024 * 1024;
    pub const DISCOVERY_TTL_SECS: u64 = 900;
    pub const MAX_DISCOVERY_ENTRIES: usize = 10_000;
    pub const MAX_CONNECT_ATTEMPTS: u32 = 5;
    pub const ATTEMPT_WINDOW_SECS: u64 = 60;
    pub const IDLE_TIMEOUT_SECS: u64 = 30 * 60;
    pub const REAP_INTERVAL_SECS: u64 = 60;
    /// Default per-query execution deadline handed to the collaborator.
    pub const EXECUTE_TIMEOUT_SECS: u64 = 60;

    pub fn result_ttl() -> Duration {
        Duration::from_secs(RESULT_TTL_SECS)
    }

    pub fn discovery_ttl() -> Duration {
        Duration::from_secs(DISCOVERY_TTL_SECS)
    }

    pub fn attempt_window() -> Duration {
        Duration::from_secs(ATTEMPT_WINDOW_SECS)
    }

    pub fn idle_timeout() -> Duration {
        Duration::from_secs(IDLE_TIMEOUT_SECS)
    }

    pub fn reap_interval() -> Duration {
        Duration::from_secs(REAP_INTERVAL_SECS)
    }

    pub fn execute_timeout() -> Duration {
        Duration::from_secs(EXECUTE_TIMEOUT_SECS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Standalone provider
// ─────────────────────────────────────────────────────────────────────────────

/// Standalone configuration bundle implementing every capability trait.
#[derive(Debug, Clone)]
pub struct BrokerConfigProvider {
    pub max_results: usize,
    pub result_ttl: Duration,
    pub max_result_bytes: Option<u64>,
    pub discovery_ttl: Duration,
    pub max_discovery_entries: usize,
    pub max_attempts: u32,
    pub attempt_window: Duration,
    pub idle_timeout: Duration,
    pub reap_interval: Duration,
}

impl Default for BrokerConfigProvider {
    fn default() -> Self {
        Self {
            max_results: defaults::MAX_RESULTS_PER_SESSION,
            result_ttl: defaults::result_ttl(),
            max_result_bytes: Some(defaults::MAX_RESULT_BYTES),
            discovery_ttl: defaults::discovery_ttl(),
            max_discovery_entries: defaults::MAX_DISCOVERY_ENTRIES,
            max_attempts: defaults::MAX_CONNECT_ATTEMPTS,
            attempt_window: defaults::attempt_window(),
            idle_timeout: defaults::idle_timeout(),
            reap_interval: defaults::reap_interval(),
        }
    }
}

impl ConfigProvider for BrokerConfigProvider {}

impl HasResultCacheConfig for BrokerConfigProvider {
    fn max_results(&self) -> usize {
        self.max_results
    }

    fn result_ttl(&self) -> Duration {
        self.result_ttl
    }

    fn max_result_bytes(&self) -> Option<u64> {
        self.max_result_bytes
    }
}

impl HasConfigCacheConfig for BrokerConfigProvider {
    fn discovery_ttl(&self) -> Duration {
        self.discovery_ttl
    }

    fn max_discovery_entries(&self) -> usize {
        self.max_discovery_entries
    }
}

impl HasRateLimitConfig for BrokerConfigProvider {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn attempt_window(&self) -> Duration {
        self.attempt_window
    }
}

impl HasRegistryConfig for BrokerConfigProvider {
    fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn reap_interval(&self) -> Duration {
        self.reap_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let config = BrokerConfigProvider::default();
        assert_eq!(config.max_results(), defaults::MAX_RESULTS_PER_SESSION);
        assert_eq!(config.result_ttl(), defaults::result_ttl());
        assert_eq!(config.max_result_bytes(), Some(defaults::MAX_RESULT_BYTES));
        assert_eq!(config.max_attempts(), defaults::MAX_CONNECT_ATTEMPTS);
        assert_eq!(config.idle_timeout(), defaults::idle_timeout());
    }

    #[test]
    fn test_custom_provider() {
        let config = BrokerConfigProvider {
            max_results: 10,
            result_ttl: Duration::from_secs(30),
            max_result_bytes: None,
            idle_timeout: Duration::from_secs(60),
            ..BrokerConfigProvider::default()
        };
        assert_eq!(config.max_results(), 10);
        assert_eq!(config.max_result_bytes(), None);
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        // Untouched fields keep their defaults.
        assert_eq!(config.reap_interval(), defaults::reap_interval());
    }
}
