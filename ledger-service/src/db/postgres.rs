//! PostgreSQL ledger store

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::db::{ServiceError, ServiceResult, with_timeout};
use shared::error::AppResult;
use shared::models::{LedgerEntry, NewLedgerEntry, NewOutboxEvent, OutboxEvent};
use sqlx::PgPool;
use uuid::Uuid;

use super::{LedgerStore, RecordOutcome};

#[derive(sqlx::FromRow)]
struct LedgerEntryRow {
    id: String,
    account_id: String,
    amount: Decimal,
    kind: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = ServiceError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            kind: row.kind.parse()?,
            id: row.id,
            account_id: row.account_id,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}

/// Ledger store backed by a shared `PgPool`
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn insert_entry_with_event(&self, entry: &NewLedgerEntry) -> ServiceResult<RecordOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            INSERT INTO ledger_entries (id, account_id, amount, kind)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            RETURNING created_at
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account_id)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((created_at,)) = inserted else {
            tx.rollback().await?;
            return Ok(RecordOutcome::Duplicate);
        };

        let new_event = NewOutboxEvent::for_entry(entry);
        let event: OutboxEvent = sqlx::query_as(
            r#"
            INSERT INTO outbox_events (id, aggregate_id, topic, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id, aggregate_id, topic, payload, created_at, published_at
            "#,
        )
        .bind(new_event.id)
        .bind(&new_event.aggregate_id)
        .bind(&new_event.topic)
        .bind(&new_event.payload)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RecordOutcome::Inserted {
            entry: entry.clone().into_entry(created_at),
            event,
        })
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn record_entry(&self, entry: &NewLedgerEntry) -> AppResult<RecordOutcome> {
        with_timeout(self.timeout, "record_entry", self.insert_entry_with_event(entry)).await
    }

    async fn get_entry(&self, id: &str) -> AppResult<Option<LedgerEntry>> {
        with_timeout(self.timeout, "get_entry", async {
            let row: Option<LedgerEntryRow> = sqlx::query_as(
                r#"
                SELECT id, account_id, amount, kind, created_at
                FROM ledger_entries
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(LedgerEntry::try_from).transpose()
        })
        .await
    }

    async fn fetch_unpublished(&self, limit: i64) -> AppResult<Vec<OutboxEvent>> {
        with_timeout(self.timeout, "fetch_unpublished", async {
            let rows: Vec<OutboxEvent> = sqlx::query_as(
                r#"
                SELECT id, aggregate_id, topic, payload, created_at, published_at
                FROM outbox_events
                WHERE published_at IS NULL
                ORDER BY seq
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await
    }

    async fn mark_published(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        with_timeout(self.timeout, "mark_published", async {
            let result = sqlx::query(
                r#"
                UPDATE outbox_events
                SET published_at = $2
                WHERE id = $1 AND published_at IS NULL
                "#,
            )
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() == 1)
        })
        .await
    }

    async fn count_unpublished(&self) -> AppResult<i64> {
        with_timeout(self.timeout, "count_unpublished", async {
            let (count,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM outbox_events WHERE published_at IS NULL",
            )
            .fetch_one(&self.pool)
            .await?;
            Ok(count)
        })
        .await
    }
}
