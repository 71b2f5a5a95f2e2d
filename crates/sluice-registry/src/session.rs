//! A session: one token, one connection, one private result cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use sluice_store::{ResultCache, StoreStats};
use sluice_types::connection::SharedConnection;
use sluice_types::result::QueryResult;

/// Caller-supplied metadata describing what the connection is bound to.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    /// Authenticated database user.
    pub user: String,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
}

impl SessionMeta {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            warehouse: None,
            database: None,
            schema: None,
            role: None,
        }
    }

    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Last-use bookkeeping: a monotonic instant for expiry arithmetic and a
/// wall-clock stamp for summaries.
#[derive(Debug, Clone, Copy)]
struct LastUse {
    mono: Instant,
    wall: DateTime<Utc>,
}

impl LastUse {
    fn now() -> Self {
        Self {
            mono: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// Server-side record binding a client token to one live connection and
/// its private result cache.
///
/// Sessions are owned by the registry and handed out as `Arc`s. A caller
/// may keep its handle after the registry removes the session; the result
/// cache stays readable, but the connection will have been closed.
pub struct Session {
    token: String,
    connection: SharedConnection,
    meta: SessionMeta,
    created_at: DateTime<Utc>,
    last_used: Mutex<LastUse>,
    use_count: AtomicU64,
    results: ResultCache,
}

impl Session {
    pub(crate) fn new(
        token: String,
        connection: SharedConnection,
        meta: SessionMeta,
        results: ResultCache,
    ) -> Self {
        Self {
            token,
            connection,
            meta,
            created_at: Utc::now(),
            last_used: Mutex::new(LastUse::now()),
            use_count: AtomicU64::new(0),
            results,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    /// The session's connection. Single-owner: concurrent queries against
    /// it are the caller's responsibility to serialize.
    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    /// The session's private result cache.
    pub fn results(&self) -> &ResultCache {
        &self.results
    }

    pub fn use_count(&self) -> u64 {
        self.use_count.load(Ordering::Relaxed)
    }

    /// How long since the session was last used.
    pub fn idle_for(&self) -> Duration {
        self.last_used.lock().mono.elapsed()
    }

    /// Record a use: refresh the idle clock and bump the use counter.
    pub fn touch(&self) {
        *self.last_used.lock() = LastUse::now();
        self.use_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Execute a statement and cache the outcome under a fresh query id.
    ///
    /// Execution failures are cached as failed results, not raised — the
    /// caller inspects the returned [`QueryResult`] for the outcome.
    pub async fn run(&self, sql: &str, timeout: Duration) -> (String, QueryResult) {
        let query_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let result = match self.connection.execute(sql, timeout).await {
            Ok(result) => result.with_timing(started_at, Utc::now()),
            Err(err) => {
                debug!(session = %self.token, error = %err, "query execution failed");
                QueryResult::failed(err.to_string()).with_timing(started_at, Utc::now())
            }
        };

        self.results.put(query_id.clone(), result.clone());
        (query_id, result)
    }

    /// Cascading teardown: drop cached results, then release the
    /// connection. Invoked exactly once, by whoever removed the session
    /// from the registry map.
    pub(crate) async fn teardown(&self) {
        self.results.clear();
        self.connection.close().await;
    }

    /// Snapshot for registry statistics.
    pub fn summary(&self) -> SessionSummary {
        let last_used = *self.last_used.lock();
        SessionSummary {
            token: token_prefix(&self.token),
            user: self.meta.user.clone(),
            warehouse: self.meta.warehouse.clone(),
            database: self.meta.database.clone(),
            schema: self.meta.schema.clone(),
            role: self.meta.role.clone(),
            idle_secs: last_used.mono.elapsed().as_secs(),
            use_count: self.use_count(),
            created_at: self.created_at,
            last_used_at: last_used.wall,
            results: self.results.stats(),
        }
    }
}

/// Externally visible session snapshot. The token is truncated so
/// summaries can be logged or served without leaking credentials.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub token: String,
    pub user: String,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
    pub idle_secs: u64,
    pub use_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub results: StoreStats,
}

/// First eight characters of a token, for summaries.
fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}
