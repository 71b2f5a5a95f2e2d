//! Connection capability for the external analytic database.
//!
//! The broker never speaks the database's wire protocol itself; it holds an
//! opaque [`Connection`] per session and drives it through this trait. The
//! embedding service supplies the real implementation; [`MockConnection`]
//! provides a scriptable stand-in for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::result::QueryResult;

/// Errors reported by a [`Connection`].
///
/// `Unreachable` and `Timeout` describe the transport; `Query` is the
/// database rejecting the statement itself. All three are ordinary values
/// to the caching layer — a failed execution is cached like any other
/// result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    /// The connection has been closed and cannot run queries.
    #[error("connection is closed")]
    Closed,

    /// The database could not be reached.
    #[error("database unreachable: {0}")]
    Unreachable(String),

    /// The query exceeded its caller-imposed deadline.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The database rejected or failed the query.
    #[error("query failed: {0}")]
    Query(String),
}

/// A live connection to the external analytic database.
///
/// One connection is owned by exactly one session; callers serialize
/// per-session execution if the underlying driver is not concurrency-safe.
/// `close` must be idempotent from the driver's point of view, but the
/// registry guarantees it is invoked at most once per session.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a statement under a caller-imposed deadline.
    async fn execute(&self, sql: &str, timeout: Duration) -> Result<QueryResult, ConnectionError>;

    /// Lightweight liveness check (the `SELECT 1` of the protocol).
    async fn probe(&self) -> bool;

    /// Release the underlying network resource.
    async fn close(&self);
}

/// Shared handle to a connection trait object.
pub type SharedConnection = Arc<dyn Connection>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Connection
// ─────────────────────────────────────────────────────────────────────────────

/// Scriptable connection for testing.
///
/// Responses queued with [`push_response`](MockConnection::push_response)
/// are returned in order; once the queue is empty, `execute` returns an
/// empty successful result. Liveness is toggled with
/// [`set_alive`](MockConnection::set_alive), and every `close` is counted
/// so tests can assert exactly-once teardown.
#[derive(Debug, Default)]
pub struct MockConnection {
    dead: AtomicBool,
    close_count: AtomicUsize,
    responses: std::sync::Mutex<Vec<Result<QueryResult, ConnectionError>>>,
    executed: std::sync::Mutex<Vec<String>>,
}

impl MockConnection {
    /// Create a live mock connection with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock connection whose probe already fails.
    pub fn dead() -> Self {
        let conn = Self::new();
        conn.set_alive(false);
        conn
    }

    /// Queue a response for the next `execute` call.
    pub fn push_response(&self, response: Result<QueryResult, ConnectionError>) {
        self.responses.lock().expect("mock lock").push(response);
    }

    /// Toggle probe liveness.
    pub fn set_alive(&self, alive: bool) {
        self.dead.store(!alive, Ordering::SeqCst);
    }

    /// How many times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Statements seen by `execute`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&self, sql: &str, timeout: Duration) -> Result<QueryResult, ConnectionError> {
        self.executed
            .lock()
            .expect("mock lock")
            .push(sql.to_string());

        if self.close_count() > 0 {
            return Err(ConnectionError::Closed);
        }
        if self.dead.load(Ordering::SeqCst) {
            return Err(ConnectionError::Unreachable("mock connection down".into()));
        }

        let scripted = {
            let mut responses = self.responses.lock().expect("mock lock");
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };
        let _ = timeout;
        scripted.unwrap_or_else(|| Ok(QueryResult::succeeded(Vec::new(), Vec::new())))
    }

    async fn probe(&self) -> bool {
        !self.dead.load(Ordering::SeqCst) && self.close_count() == 0
    }

    async fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}
