// ABOUTME: Record-store abstraction over an untrusted hosted row store
// ABOUTME: Equality/range filters, ordering, limits, singleton reads, and push subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! # Record Store
//!
//! The hosted backend is an opaque row store: this trait is the whole of
//! what the client core asks of it. Rows are JSON objects; sensitive
//! columns arrive here already encrypted and leave still encrypted - the
//! store never sees plaintext and the services never hand it any.
//!
//! Singleton reads distinguish "no row" (`Ok(None)`) from failure; that
//! non-error absent state is load-bearing for safety plans and supporter
//! profiles.

pub mod memory;

pub use memory::MemoryStore;

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// A stored row: column name to JSON value
pub type Row = serde_json::Map<String, Value>;

/// Comparison operator for a filter predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Column equals value
    Eq,
    /// Column is greater than or equal to value
    Gte,
    /// Column is strictly less than value
    Lt,
}

/// A single column predicate
#[derive(Debug, Clone)]
pub struct Filter {
    /// Column name
    pub column: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Comparison value
    pub value: Value,
}

impl Filter {
    /// Equality predicate
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// Whether a row satisfies this predicate
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(&self.column) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::Gte => {
                compare_values(actual, &self.value) != Some(std::cmp::Ordering::Less)
            }
            FilterOp::Lt => compare_values(actual, &self.value) == Some(std::cmp::Ordering::Less),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Ascending (oldest-first for timestamps)
    Asc,
    /// Descending (newest-first for timestamps)
    Desc,
}

/// A select query: all `filters` must hold, and - when present - at least
/// one of `any_of` must hold
#[derive(Debug, Clone)]
pub struct Query {
    /// Target table
    pub table: String,
    /// Conjunctive predicates
    pub filters: Vec<Filter>,
    /// Disjunctive predicate group (e.g. "seeker or supporter is me")
    pub any_of: Vec<Filter>,
    /// Ordering column and direction
    pub order_by: Option<(String, Order)>,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query against a table
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            any_of: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add an equality predicate
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Add a greater-than-or-equal predicate
    #[must_use]
    pub fn gte(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op: FilterOp::Gte,
            value: value.into(),
        });
        self
    }

    /// Add a strictly-less-than predicate
    #[must_use]
    pub fn lt(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op: FilterOp::Lt,
            value: value.into(),
        });
        self
    }

    /// Add a predicate to the disjunctive group
    #[must_use]
    pub fn any_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.any_of.push(Filter::eq(column, value));
        self
    }

    /// Order ascending by a column
    #[must_use]
    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some((column.into(), Order::Asc));
        self
    }

    /// Order descending by a column
    #[must_use]
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some((column.into(), Order::Desc));
        self
    }

    /// Cap the number of returned rows
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every conjunctive predicate and, when a
    /// disjunctive group exists, at least one of it
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let all = self.filters.iter().all(|f| f.matches(row));
        let any = self.any_of.is_empty() || self.any_of.iter().any(|f| f.matches(row));
        all && any
    }
}

/// Push subscription over inserted rows matching a filter
pub struct Subscription {
    receiver: broadcast::Receiver<Row>,
    filter: Filter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<Row>, filter: Filter) -> Self {
        Self { receiver, filter }
    }

    /// The next matching row, `None` once the channel closes. Lagged
    /// deliveries are skipped; ordering beyond the transport's own
    /// delivery order is not guaranteed.
    pub async fn next(&mut self) -> Option<Row> {
        loop {
            match self.receiver.recv().await {
                Ok(row) if self.filter.matches(&row) => return Some(row),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscription lagged; rows dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The external record store seam
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a row and return it as persisted (id and creation timestamp
    /// stamped)
    async fn insert(&self, table: &str, row: Row) -> AppResult<Row>;

    /// Select all matching rows
    async fn select(&self, query: Query) -> AppResult<Vec<Row>>;

    /// Select at most one row; absence is `Ok(None)`, not an error
    async fn select_one(&self, query: Query) -> AppResult<Option<Row>>;

    /// Merge `changes` into the row with the given id and return the
    /// updated row
    async fn update(&self, table: &str, id: &str, changes: Row) -> AppResult<Row>;

    /// Subscribe to rows inserted into a table that match a filter
    async fn subscribe(&self, table: &str, filter: Filter) -> AppResult<Subscription>;
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // numbers compare numerically so 5 == 5.0
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn order_rows(rows: &mut [Row], column: &str, order: Order) {
    rows.sort_by(|a, b| {
        let av = a.get(column);
        let bv = b.get(column);
        let ordering = match (av, bv) {
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => std::cmp::Ordering::Equal,
        };
        match order {
            Order::Asc => ordering,
            Order::Desc => ordering.reverse(),
        }
    });
}

// ── Row accessors ───────────────────────────────────────────────────────
// Services read persisted rows through these to keep column handling in
// one place. Missing required columns surface as store errors.

pub(crate) fn get_str(row: &Row, column: &str) -> AppResult<String> {
    row.get(column)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| AppError::store(format!("missing column {column}")))
}

pub(crate) fn get_opt_str(row: &Row, column: &str) -> Option<String> {
    row.get(column)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

pub(crate) fn get_opt_uuid(row: &Row, column: &str) -> Option<Uuid> {
    row.get(column)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

pub(crate) fn get_u8(row: &Row, column: &str) -> AppResult<u8> {
    row.get(column)
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| AppError::store(format!("missing or invalid column {column}")))
}

pub(crate) fn get_opt_u8(row: &Row, column: &str) -> Option<u8> {
    row.get(column)
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok())
}

pub(crate) fn get_opt_u32(row: &Row, column: &str) -> Option<u32> {
    row.get(column)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

pub(crate) fn get_u32(row: &Row, column: &str) -> AppResult<u32> {
    get_opt_u32(row, column)
        .ok_or_else(|| AppError::store(format!("missing or invalid column {column}")))
}

pub(crate) fn get_opt_f64(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(Value::as_f64)
}

pub(crate) fn get_bool(row: &Row, column: &str) -> AppResult<bool> {
    row.get(column)
        .and_then(Value::as_bool)
        .ok_or_else(|| AppError::store(format!("missing or invalid column {column}")))
}

pub(crate) fn get_datetime(row: &Row, column: &str) -> AppResult<DateTime<Utc>> {
    let raw = get_str(row, column)?;
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| AppError::store(format!("invalid timestamp in {column}: {e}")))
}

pub(crate) fn get_opt_datetime(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    get_opt_str(row, column).and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
}
