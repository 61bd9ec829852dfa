//! Ledger store
//!
//! Two tables: immutable `ledger_entries` and the `outbox_events` awaiting
//! publication. An entry and its outbox event are always written together.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;
use shared::models::{LedgerEntry, NewLedgerEntry, OutboxEvent};
use uuid::Uuid;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Result of an idempotent insert
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// New entry committed together with its outbox event
    Inserted {
        entry: LedgerEntry,
        event: OutboxEvent,
    },
    /// An entry with this id already exists; nothing was written
    Duplicate,
}

impl RecordOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, RecordOutcome::Inserted { .. })
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert the entry and its outbox event atomically, or do nothing if
    /// the id is already present
    async fn record_entry(&self, entry: &NewLedgerEntry) -> AppResult<RecordOutcome>;

    async fn get_entry(&self, id: &str) -> AppResult<Option<LedgerEntry>>;

    /// Oldest unpublished events first
    async fn fetch_unpublished(&self, limit: i64) -> AppResult<Vec<OutboxEvent>>;

    /// Set `published_at` if still unset; returns whether this call set it
    async fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    async fn count_unpublished(&self) -> AppResult<i64>;
}
