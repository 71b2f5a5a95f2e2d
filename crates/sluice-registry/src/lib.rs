//! Session registry and connection lifecycle for the Sluice query broker.
//!
//! A [`Session`] binds a client-presented token to one live connection to
//! the external analytic database and a private result cache. The
//! [`SessionRegistry`] owns every session: it mints tokens, verifies
//! liveness on lookup, expires idle sessions (lazily and via a background
//! reaper), and guarantees each connection is closed exactly once.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sluice_registry::{RegistryConfig, SessionMeta, SessionRegistry};
//!
//! let registry = SessionRegistry::new(RegistryConfig::default())?;
//! registry.start_reaper();
//!
//! let token = registry.create(connection, SessionMeta::new("analyst"));
//! if let Some(session) = registry.get(&token).await {
//!     let (query_id, result) = session.run("SELECT 1", timeout).await;
//! }
//! ```

mod config;
mod error;
mod registry;
mod session;

pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use registry::{RegistryStats, SessionRegistry};
pub use session::{Session, SessionMeta, SessionSummary};
