//! Sliding-window admission limiter for the Sluice query broker.
//!
//! Guards the session *creation* path: opening a connection to the
//! external database is expensive, so each client key (normalized client
//! address, supplied by the boundary layer) gets a bounded number of
//! attempts per rolling window. This is a hard admission gate — denied
//! attempts are dropped by the caller, never queued or retried here.
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_limiter::SlidingWindowLimiter;
//!
//! let limiter = SlidingWindowLimiter::new();
//! let decision = limiter.allow("203.0.113.7");
//! if !decision.allowed {
//!     // surface 429 with decision.retry_after_secs upstream
//! }
//! ```

mod limiter;
mod window;

pub use limiter::{Decision, Error, LimiterConfig, Result, SlidingWindowLimiter};
pub use window::RateWindow;
