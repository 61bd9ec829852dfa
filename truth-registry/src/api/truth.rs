//! Truth API handlers
//!
//! POST /api/truth/register          - upsert `{contentId, content?}`
//! GET  /api/truth/verify?contentId= - `{exists, record}`
//! GET  /api/truth/manifest?hash=    - manifest derived from a record

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};
use shared::error::{AppError, AppResult};
use shared::models::{TruthManifest, Verification};

use crate::service::{RegisterRequest, TruthRegistry};

const IDEMPOTENCY_KEY: &str = "idempotency-key";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub content_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestQuery {
    pub hash: Option<String>,
}

/// Lenient body parsing: empty or non-object JSON counts as no fields, so
/// the caller gets `contentId required` instead of a parse error
fn parse_register_body(body: &[u8]) -> AppResult<RegisterRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegisterRequest::default());
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|_| AppError::invalid("invalid json"))?;
    match value {
        Value::Object(_) => {
            serde_json::from_value(value).map_err(|_| AppError::invalid("invalid json"))
        }
        _ => Ok(RegisterRequest::default()),
    }
}

// ── POST /api/truth/register ──

pub async fn register(
    State(registry): State<TruthRegistry>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    if let Some(key) = headers.get(IDEMPOTENCY_KEY).and_then(|v| v.to_str().ok()) {
        tracing::debug!(idempotency_key = %key, "Register request");
    }

    let req = parse_register_body(&body)?;
    let record = registry.register(req).await?;
    Ok(Json(json!({ "ok": true, "record": record })))
}

// ── GET /api/truth/verify ──

pub async fn verify(
    State(registry): State<TruthRegistry>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<Verification>> {
    registry.verify(query.content_id.as_deref()).await.map(Json)
}

// ── GET /api/truth/manifest ──

pub async fn manifest(
    State(registry): State<TruthRegistry>,
    Query(query): Query<ManifestQuery>,
) -> AppResult<Json<TruthManifest>> {
    registry.manifest(query.hash.as_deref()).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register_body() {
        assert!(parse_register_body(b"").unwrap().content_id.is_none());
        assert!(parse_register_body(b"[1,2]").unwrap().content_id.is_none());
        let err = parse_register_body(b"{not json").unwrap_err();
        assert_eq!(err.message, "invalid json");

        let req = parse_register_body(br#"{"contentId":"c1","content":{"a":1}}"#).unwrap();
        assert_eq!(req.content_id, Some(Value::String("c1".into())));
    }
}
