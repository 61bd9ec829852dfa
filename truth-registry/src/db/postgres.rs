//! PostgreSQL truth store

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shared::db::with_timeout;
use shared::error::AppResult;
use shared::models::TruthRecord;
use sqlx::PgPool;

use super::TruthStore;

#[derive(Clone)]
pub struct PgTruthStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgTruthStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl TruthStore for PgTruthStore {
    async fn upsert(&self, content_id: &str, content: &Value) -> AppResult<TruthRecord> {
        with_timeout(self.timeout, "upsert_truth", async {
            let record: TruthRecord = sqlx::query_as(
                r#"
                INSERT INTO truths (content_id, content)
                VALUES ($1, $2)
                ON CONFLICT (content_id)
                DO UPDATE SET content = EXCLUDED.content, updated_at = now()
                RETURNING content_id, content
                "#,
            )
            .bind(content_id)
            .bind(content)
            .fetch_one(&self.pool)
            .await?;
            Ok(record)
        })
        .await
    }

    async fn find(&self, content_id: &str) -> AppResult<Option<TruthRecord>> {
        with_timeout(self.timeout, "find_truth", async {
            let record: Option<TruthRecord> =
                sqlx::query_as("SELECT content_id, content FROM truths WHERE content_id = $1")
                    .bind(content_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(record)
        })
        .await
    }

    async fn find_by_hash(&self, hash: &str) -> AppResult<Option<TruthRecord>> {
        with_timeout(self.timeout, "find_truth_by_hash", async {
            let record: Option<TruthRecord> = sqlx::query_as(
                r#"
                SELECT content_id, content
                FROM truths
                WHERE content_id = $1
                   OR content->'chain'->>'currHash' = $1
                   OR content->>'hash' = $1
                ORDER BY (content_id = $1) DESC, content_id
                LIMIT 1
                "#,
            )
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
            Ok(record)
        })
        .await
    }
}
