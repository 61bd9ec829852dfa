//! In-memory ledger store
//!
//! Same contract as the PostgreSQL store; used by tests and local runs
//! without a database. Entry and event are inserted under one lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::error::{AppError, AppResult};
use shared::models::{LedgerEntry, NewLedgerEntry, NewOutboxEvent, OutboxEvent};
use uuid::Uuid;

use super::{LedgerStore, RecordOutcome};

#[derive(Default)]
struct Tables {
    entries: HashMap<String, LedgerEntry>,
    /// Insertion order doubles as the `seq` column
    outbox: Vec<OutboxEvent>,
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    tables: Mutex<Tables>,
    /// Number of upcoming `record_entry` calls that fail with a retryable error
    failures: AtomicU32,
    /// Same, but failing after the entry row is written
    outbox_failures: AtomicU32,
    mark_failures: AtomicU32,
}

fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` writes fail with a database error
    pub fn fail_next_writes(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` writes fail between the entry and outbox inserts
    pub fn fail_next_outbox_writes(&self, count: u32) {
        self.outbox_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` `mark_published` calls time out
    pub fn fail_next_marks(&self, count: u32) {
        self.mark_failures.store(count, Ordering::SeqCst);
    }

    pub fn entry_count(&self) -> usize {
        self.tables.lock().entries.len()
    }

    pub fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.tables.lock().outbox.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn record_entry(&self, entry: &NewLedgerEntry) -> AppResult<RecordOutcome> {
        if take(&self.failures) {
            return Err(AppError::database("simulated write failure"));
        }

        let mut tables = self.tables.lock();
        if tables.entries.contains_key(&entry.id) {
            return Ok(RecordOutcome::Duplicate);
        }

        let now = Utc::now();
        let stored = entry.clone().into_entry(now);
        let event = NewOutboxEvent::for_entry(entry).into_event(now);
        tables.entries.insert(stored.id.clone(), stored.clone());
        if take(&self.outbox_failures) {
            // the transaction rolls back both rows
            tables.entries.remove(&stored.id);
            return Err(AppError::database("simulated outbox write failure"));
        }
        tables.outbox.push(event.clone());

        Ok(RecordOutcome::Inserted {
            entry: stored,
            event,
        })
    }

    async fn get_entry(&self, id: &str) -> AppResult<Option<LedgerEntry>> {
        Ok(self.tables.lock().entries.get(id).cloned())
    }

    async fn fetch_unpublished(&self, limit: i64) -> AppResult<Vec<OutboxEvent>> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .tables
            .lock()
            .outbox
            .iter()
            .filter(|e| !e.is_published())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        if take(&self.mark_failures) {
            return Err(AppError::timeout("simulated mark timeout"));
        }
        let mut tables = self.tables.lock();
        match tables
            .outbox
            .iter_mut()
            .find(|e| e.id == id && e.published_at.is_none())
        {
            Some(event) => {
                event.published_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_unpublished(&self) -> AppResult<i64> {
        Ok(self
            .tables
            .lock()
            .outbox
            .iter()
            .filter(|e| !e.is_published())
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::EntryKind;

    fn entry(id: &str, account: &str) -> NewLedgerEntry {
        NewLedgerEntry {
            id: id.into(),
            account_id: account.into(),
            amount: Decimal::from(10),
            kind: EntryKind::Credit,
        }
    }

    #[tokio::test]
    async fn test_duplicate_writes_nothing() {
        let store = MemoryLedgerStore::new();
        assert!(store.record_entry(&entry("e1", "acc1")).await.unwrap().is_inserted());
        assert_eq!(
            store.record_entry(&entry("e1", "acc1")).await.unwrap(),
            RecordOutcome::Duplicate
        );
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.outbox_events().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_published_once() {
        let store = MemoryLedgerStore::new();
        store.record_entry(&entry("e1", "acc1")).await.unwrap();
        let pending = store.fetch_unpublished(10).await.unwrap();
        assert_eq!(pending.len(), 1);

        let id = pending[0].id;
        assert!(store.mark_published(id, Utc::now()).await.unwrap());
        assert!(!store.mark_published(id, Utc::now()).await.unwrap());
        assert_eq!(store.count_unpublished().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_simulated_failures() {
        let store = MemoryLedgerStore::new();
        store.fail_next_writes(1);
        let err = store.record_entry(&entry("e1", "acc1")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.record_entry(&entry("e1", "acc1")).await.unwrap().is_inserted());
    }

    #[tokio::test]
    async fn test_outbox_failure_leaves_no_entry() {
        let store = MemoryLedgerStore::new();
        store.fail_next_outbox_writes(1);
        let err = store.record_entry(&entry("e1", "acc1")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.entry_count(), 0);
        assert!(store.outbox_events().is_empty());
        assert!(store.get_entry("e1").await.unwrap().is_none());

        // the retry writes the full pair
        assert!(store.record_entry(&entry("e1", "acc1")).await.unwrap().is_inserted());
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.outbox_events().len(), 1);
    }
}
