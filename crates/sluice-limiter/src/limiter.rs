//! Sliding-window rate limiter keyed by client.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{trace, warn};

use sluice_types::config::{HasRateLimitConfig, defaults};

use crate::window::RateWindow;

/// Error type for limiter construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Construction rejected an invalid policy parameter.
    #[error("invalid limiter configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type for limiter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Admission decision for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether the attempt may proceed.
    pub allowed: bool,

    /// Seconds until the oldest counted attempt leaves the window.
    /// Zero when allowed; at least 1 when denied.
    pub retry_after_secs: u64,
}

impl Decision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_secs: 0,
        }
    }

    fn denied(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs,
        }
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Attempts allowed per key within one window.
    pub max_attempts: u32,

    /// Length of the sliding window (must be non-zero).
    pub window: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_CONNECT_ATTEMPTS,
            window: defaults::attempt_window(),
        }
    }
}

impl LimiterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any configuration provider.
    pub fn from_provider<C: HasRateLimitConfig>(config: &C) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            window: config.attempt_window(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be at least 1"));
        }
        if self.window.is_zero() {
            return Err(Error::InvalidConfig("window must be non-zero"));
        }
        Ok(())
    }
}

/// Per-key sliding-window counter of connection attempts.
///
/// Each key's window is pruned on every access, so stale keys cost one
/// empty `VecDeque` at most and are never explicitly destroyed. The
/// limiter is a hard admission gate: it neither queues nor retries.
pub struct SlidingWindowLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    config: LimiterConfig,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the default policy (5 attempts per minute).
    pub fn new() -> Self {
        // Defaults are statically valid.
        Self::with_config(LimiterConfig::default()).expect("default config is valid")
    }

    /// Create a limiter with an explicit policy.
    pub fn with_config(config: LimiterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            windows: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// Decide whether one attempt by `key` may proceed, recording it if so.
    pub fn allow(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.entry(key.to_string()).or_default();
        window.prune(now, self.config.window);

        if window.len() as u32 >= self.config.max_attempts {
            let retry_after_secs = window
                .oldest()
                .map(|oldest| {
                    let remaining = self.config.window.saturating_sub(now.duration_since(oldest));
                    remaining.as_secs() + 1
                })
                .unwrap_or(1);
            warn!(
                client = %key,
                retry_after_secs,
                "connection attempts throttled"
            );
            return Decision::denied(retry_after_secs);
        }

        window.record(now);
        trace!(client = %key, attempts = window.len(), "connection attempt admitted");
        Decision::allowed()
    }

    /// Attempts `key` has left in the current window.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        match windows.get_mut(key) {
            None => self.config.max_attempts,
            Some(window) => {
                window.prune(now, self.config.window);
                self.config.max_attempts.saturating_sub(window.len() as u32)
            }
        }
    }

    /// The limiter's policy parameters.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_attempts_within_limit_allowed() {
        let limiter = SlidingWindowLimiter::new();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1").allowed);
        }
    }

    #[test]
    fn test_sixth_attempt_denied_with_retry_after() {
        let limiter = SlidingWindowLimiter::new();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1").allowed);
        }

        let decision = limiter.allow("10.0.0.1");
        assert!(!decision.allowed);
        // The window is 60s and almost none of it has elapsed.
        assert!((59..=61).contains(&decision.retry_after_secs));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SlidingWindowLimiter::new();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1").allowed);
        }

        assert!(!limiter.allow("10.0.0.1").allowed);
        assert!(limiter.allow("10.0.0.2").allowed);
    }

    #[test]
    fn test_window_rolls_over() {
        let limiter = SlidingWindowLimiter::with_config(
            LimiterConfig::new()
                .with_max_attempts(2)
                .with_window(Duration::from_millis(100)),
        )
        .unwrap();

        assert!(limiter.allow("k").allowed);
        assert!(limiter.allow("k").allowed);
        assert!(!limiter.allow("k").allowed);

        thread::sleep(Duration::from_millis(150));

        // The old attempts have left the window.
        assert!(limiter.allow("k").allowed);
    }

    #[test]
    fn test_denied_attempt_not_counted() {
        let limiter = SlidingWindowLimiter::with_config(
            LimiterConfig::new()
                .with_max_attempts(1)
                .with_window(Duration::from_millis(100)),
        )
        .unwrap();

        assert!(limiter.allow("k").allowed);
        assert!(!limiter.allow("k").allowed);
        assert!(!limiter.allow("k").allowed);

        thread::sleep(Duration::from_millis(150));

        // Denied attempts did not extend the window.
        assert!(limiter.allow("k").allowed);
    }

    #[test]
    fn test_retry_after_minimum_one() {
        let limiter = SlidingWindowLimiter::with_config(
            LimiterConfig::new()
                .with_max_attempts(1)
                .with_window(Duration::from_millis(50)),
        )
        .unwrap();

        limiter.allow("k");
        let decision = limiter.allow("k");
        assert!(!decision.allowed);
        assert!(decision.retry_after_secs >= 1);
    }

    #[test]
    fn test_remaining_accounting() {
        let limiter = SlidingWindowLimiter::new();
        assert_eq!(limiter.remaining("k"), 5);

        limiter.allow("k");
        limiter.allow("k");
        assert_eq!(limiter.remaining("k"), 3);

        for _ in 0..5 {
            limiter.allow("k");
        }
        assert_eq!(limiter.remaining("k"), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(SlidingWindowLimiter::with_config(LimiterConfig::new().with_max_attempts(0)).is_err());
        assert!(
            SlidingWindowLimiter::with_config(LimiterConfig::new().with_window(Duration::ZERO))
                .is_err()
        );
    }
}
