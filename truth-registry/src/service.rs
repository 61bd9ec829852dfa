//! Register / verify / manifest rules
//!
//! A content identifier is either unregistered or registered. Registering
//! is an upsert (last write wins); verifying never fails for an unknown id.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{TruthManifest, TruthRecord, Verification};

use crate::db::TruthStore;

/// Body of `POST /api/truth/register`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// String, or a number taken by its decimal form
    #[serde(default)]
    pub content_id: Option<Value>,
    #[serde(default)]
    pub content: Option<Value>,
}

fn content_id_of(raw: Option<&Value>) -> AppResult<String> {
    let id = match raw {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if id.is_empty() {
        return Err(AppError::required("contentId"));
    }
    Ok(id)
}

fn content_of(raw: Option<Value>) -> AppResult<Value> {
    match raw {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(obj @ Value::Object(_)) => Ok(obj),
        Some(_) => Err(AppError::new(ErrorCode::InvalidContent)),
    }
}

/// Validation-required, non-empty trimmed query parameter
fn required_param(value: Option<&str>, field: &str) -> AppResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::required(field)),
    }
}

#[derive(Clone)]
pub struct TruthRegistry {
    store: Arc<dyn TruthStore>,
}

impl TruthRegistry {
    pub fn new(store: Arc<dyn TruthStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<TruthRecord> {
        let content_id = content_id_of(req.content_id.as_ref())?;
        let content = content_of(req.content)?;
        let record = self.store.upsert(&content_id, &content).await?;
        tracing::info!(content_id = %record.content_id, "Truth registered");
        Ok(record)
    }

    pub async fn verify(&self, content_id: Option<&str>) -> AppResult<Verification> {
        let content_id = required_param(content_id, "contentId")?;
        let record = self.store.find(&content_id).await?;
        tracing::debug!(content_id = %content_id, exists = record.is_some(), "Truth verified");
        Ok(Verification::from(record))
    }

    pub async fn manifest(&self, hash: Option<&str>) -> AppResult<TruthManifest> {
        let hash = required_param(hash, "hash")?;
        self.store
            .find_by_hash(&hash)
            .await?
            .map(|record| TruthManifest::from(&record))
            .ok_or_else(|| AppError::not_found(format!("manifest {hash}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryTruthStore;
    use serde_json::json;

    fn registry() -> TruthRegistry {
        TruthRegistry::new(Arc::new(MemoryTruthStore::new()))
    }

    fn request(body: Value) -> RegisterRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let registry = registry();
        registry
            .register(request(json!({"contentId": "c1", "content": {"a": 1}})))
            .await
            .unwrap();
        registry
            .register(request(json!({"contentId": " c1 ", "content": {"a": 2}})))
            .await
            .unwrap();

        let v = registry.verify(Some("c1")).await.unwrap();
        assert!(v.exists);
        assert_eq!(v.record.unwrap().content, json!({"a": 2}));
    }

    #[tokio::test]
    async fn test_content_rules() {
        let registry = registry();
        let record = registry
            .register(request(json!({"contentId": 42})))
            .await
            .unwrap();
        assert_eq!(record.content_id, "42");
        assert_eq!(record.content, json!({}));

        let err = registry
            .register(request(json!({"contentId": "c", "content": [1, 2]})))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidContent);

        let err = registry
            .register(request(json!({"contentId": "   "})))
            .await
            .unwrap_err();
        assert_eq!(err.message, "contentId required");
    }

    #[tokio::test]
    async fn test_unknown_id_and_missing_param() {
        let registry = registry();
        let v = registry.verify(Some("nope")).await.unwrap();
        assert!(!v.exists);
        assert!(v.record.is_none());

        let err = registry.verify(None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
    }

    #[tokio::test]
    async fn test_manifest_by_chain_hash() {
        let registry = registry();
        registry
            .register(request(json!({
                "contentId": "c9",
                "content": {"creatorDid": "did:key:z6", "chain": {"currHash": "h1"}}
            })))
            .await
            .unwrap();

        let manifest = registry.manifest(Some("h1")).await.unwrap();
        assert_eq!(manifest.content_id, "c9");
        assert_eq!(manifest.creator_did.as_deref(), Some("did:key:z6"));

        let err = registry.manifest(Some("h2")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err = registry.manifest(Some("")).await.unwrap_err();
        assert_eq!(err.message, "hash required");
    }
}
