//! Configuration for the session registry.

use std::time::Duration;

use sluice_types::config::{HasRegistryConfig, defaults};

use crate::error::{Error, Result};

/// Configuration for a [`SessionRegistry`](crate::SessionRegistry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Idle time after which a session is reclaimed (must be non-zero).
    pub idle_timeout: Duration,

    /// Interval between background reaper sweeps (must be non-zero).
    pub reap_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_timeout: defaults::idle_timeout(),
            reap_interval: defaults::reap_interval(),
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any configuration provider.
    pub fn from_provider<C: HasRegistryConfig>(config: &C) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            reap_interval: config.reap_interval(),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_reap_interval(mut self, reap_interval: Duration) -> Self {
        self.reap_interval = reap_interval;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.idle_timeout.is_zero() {
            return Err(Error::InvalidConfig("idle_timeout must be non-zero"));
        }
        if self.reap_interval.is_zero() {
            return Err(Error::InvalidConfig("reap_interval must be non-zero"));
        }
        Ok(())
    }
}
