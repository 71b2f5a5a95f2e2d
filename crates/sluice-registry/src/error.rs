//! Error types for registry operations.

/// Error type for registry operations.
///
/// Lookup misses, idle expiry, and dead probes are not errors — they all
/// surface as "no session" so the caller reconnects. Errors are reserved
/// for configurations that indicate a caller bug.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Construction rejected an invalid policy parameter.
    #[error("invalid registry configuration: {0}")]
    InvalidConfig(&'static str),

    /// The per-session result cache configuration was invalid.
    #[error(transparent)]
    Store(#[from] sluice_store::Error),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;
