//! Query result value types.
//!
//! A [`QueryResult`] is the unit stored in the per-session result cache:
//! column metadata, row data as JSON values, the terminal outcome, and
//! timing. Failed executions are represented as ordinary values so the
//! caching layer never has to special-case them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column metadata reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Terminal outcome of a query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum QueryOutcome {
    Succeeded,
    Failed { error: String },
}

/// A computed query result, cached per session under its query id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    pub outcome: QueryOutcome,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl QueryResult {
    /// Build a successful result, stamped with the current time.
    pub fn succeeded(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        let now = Utc::now();
        Self {
            columns,
            rows,
            outcome: QueryOutcome::Succeeded,
            started_at: now,
            completed_at: now,
        }
    }

    /// Build a failed result carrying the collaborator's error message.
    pub fn failed(error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            outcome: QueryOutcome::Failed {
                error: error.into(),
            },
            started_at: now,
            completed_at: now,
        }
    }

    /// Attach execution timing.
    pub fn with_timing(mut self, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self.completed_at = completed_at;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, QueryOutcome::Failed { .. })
    }

    /// Wall-clock execution time in milliseconds.
    pub fn execution_time_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// Deterministic estimate of the serialized result size in bytes.
    ///
    /// Used as the byte-budget hint when caching. The estimate is the
    /// serialized length of the row data plus a fixed allowance per
    /// column; it only needs to be deterministic and monotonic, not exact.
    pub fn estimated_size(&self) -> u64 {
        let row_bytes = serde_json::to_vec(&self.rows)
            .map(|buf| buf.len() as u64)
            .unwrap_or_else(|_| self.rows.len() as u64 * 64);
        row_bytes + self.columns.len() as u64 * 32
    }

    /// A paginated view over the rows. Pages are 1-based; a page past the
    /// end is empty with `has_more = false`.
    pub fn page(&self, page: usize, page_size: usize) -> ResultPage {
        let page = page.max(1);
        let total_rows = self.rows.len();
        let start = (page - 1).saturating_mul(page_size).min(total_rows);
        let end = start.saturating_add(page_size).min(total_rows);

        ResultPage {
            columns: self.columns.clone(),
            rows: self.rows[start..end].to_vec(),
            total_rows,
            page,
            page_size,
            has_more: end < total_rows,
        }
    }
}

/// One page of a cached result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPage {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}
