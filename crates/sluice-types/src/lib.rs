//! Shared types for the Sluice query broker.
//!
//! This crate holds the pieces every other Sluice crate agrees on:
//!
//! - the [`Connection`] capability for the external analytic database,
//!   together with its error taxonomy and a scriptable [`MockConnection`]
//!   for tests
//! - the [`QueryResult`] value type cached per session
//! - configuration capability traits so components can be configured
//!   without knowing about each other's config structs

pub mod config;
pub mod connection;
pub mod result;

pub use config::{
    BrokerConfigProvider, ConfigProvider, HasConfigCacheConfig, HasRateLimitConfig,
    HasRegistryConfig, HasResultCacheConfig, defaults as config_defaults,
};
pub use connection::{Connection, ConnectionError, MockConnection, SharedConnection};
pub use result::{Column, QueryOutcome, QueryResult, ResultPage};
