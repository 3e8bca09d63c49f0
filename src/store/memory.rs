// ABOUTME: In-process record store used by tests and local-first mode
// ABOUTME: Dashmap-backed tables with broadcast channels for push subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness

//! In-process [`RecordStore`] implementation.
//!
//! Semantics deliberately mirror the hosted store: inserted rows get an
//! `id` and `created_at` stamped if absent, singleton selects return
//! `Ok(None)` when nothing matches, and concurrent updates to the same row
//! are last-write-wins with no version check.

use crate::errors::{AppError, AppResult};
use crate::store::{order_rows, Filter, Query, RecordStore, Row, Subscription};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Broadcast capacity per table channel; slow subscribers lag past this
const CHANNEL_CAPACITY: usize = 64;

/// In-memory record store
#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Row>>,
    channels: DashMap<String, broadcast::Sender<Row>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, table: &str) -> broadcast::Sender<Row> {
        self.channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn select_rows(&self, query: &Query) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .tables
            .get(&query.table)
            .map(|table| {
                table
                    .iter()
                    .filter(|row| query.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, order)) = &query.order_by {
            order_rows(&mut rows, column, *order);
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        rows
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, table: &str, mut row: Row) -> AppResult<Row> {
        if !row.contains_key("id") {
            row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            row.insert("created_at".into(), Value::String(Utc::now().to_rfc3339()));
        }

        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        // subscribers may or may not exist; send errors just mean none do
        if let Some(tx) = self.channels.get(table) {
            let _ = tx.send(row.clone());
        }

        Ok(row)
    }

    async fn select(&self, query: Query) -> AppResult<Vec<Row>> {
        Ok(self.select_rows(&query))
    }

    async fn select_one(&self, query: Query) -> AppResult<Option<Row>> {
        Ok(self.select_rows(&query).into_iter().next())
    }

    async fn update(&self, table: &str, id: &str, changes: Row) -> AppResult<Row> {
        let mut rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| AppError::store(format!("unknown table {table}")))?;

        let row = rows
            .iter_mut()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| AppError::store(format!("row {id} not found in {table}")))?;

        for (column, value) in changes {
            row.insert(column, value);
        }
        Ok(row.clone())
    }

    async fn subscribe(&self, table: &str, filter: Filter) -> AppResult<Subscription> {
        Ok(Subscription::new(self.sender(table).subscribe(), filter))
    }
}
