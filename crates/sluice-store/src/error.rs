//! Error types for store operations.

/// Error type for store operations.
///
/// Cache misses and expiries are not errors; the only failure mode a
/// store exposes is a configuration that indicates a caller bug.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Construction rejected an invalid policy parameter.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
