//! Truth store
//!
//! One row per content identifier; registering again replaces the content.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use shared::error::AppResult;
use shared::models::TruthRecord;

pub use memory::MemoryTruthStore;
pub use postgres::PgTruthStore;

#[async_trait]
pub trait TruthStore: Send + Sync {
    /// Insert or overwrite, returning the stored record
    async fn upsert(&self, content_id: &str, content: &Value) -> AppResult<TruthRecord>;

    async fn find(&self, content_id: &str) -> AppResult<Option<TruthRecord>>;

    /// Record whose `content_id`, `content.chain.currHash` or `content.hash`
    /// equals `hash`; an exact `content_id` match wins
    async fn find_by_hash(&self, hash: &str) -> AppResult<Option<TruthRecord>>;
}
