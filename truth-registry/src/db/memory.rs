//! In-memory truth store

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use shared::error::{AppError, AppResult};
use shared::models::TruthRecord;

use super::TruthStore;

#[derive(Default)]
pub struct MemoryTruthStore {
    records: DashMap<String, TruthRecord>,
    failures: AtomicU32,
}

impl MemoryTruthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls fail with a database error
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn check_failure(&self) -> AppResult<()> {
        match self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(_) => Err(AppError::database("simulated store failure")),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl TruthStore for MemoryTruthStore {
    async fn upsert(&self, content_id: &str, content: &Value) -> AppResult<TruthRecord> {
        self.check_failure()?;
        let record = TruthRecord {
            content_id: content_id.to_string(),
            content: content.clone(),
        };
        self.records.insert(record.content_id.clone(), record.clone());
        Ok(record)
    }

    async fn find(&self, content_id: &str) -> AppResult<Option<TruthRecord>> {
        self.check_failure()?;
        Ok(self.records.get(content_id).map(|r| r.value().clone()))
    }

    async fn find_by_hash(&self, hash: &str) -> AppResult<Option<TruthRecord>> {
        self.check_failure()?;
        if let Some(exact) = self.records.get(hash) {
            return Ok(Some(exact.value().clone()));
        }
        Ok(self
            .records
            .iter()
            .filter(|r| {
                let content = &r.content;
                content.pointer("/chain/currHash").and_then(Value::as_str) == Some(hash)
                    || content.get("hash").and_then(Value::as_str) == Some(hash)
            })
            .min_by(|a, b| a.content_id.cmp(&b.content_id))
            .map(|r| r.value().clone()))
    }
}
