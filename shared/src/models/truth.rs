//! Truth Record Model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata registered for a content identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TruthRecord {
    pub content_id: String,
    pub content: Value,
}

impl TruthRecord {
    /// Hash that identifies the current version of the content, if any
    pub fn current_hash(&self) -> Option<&str> {
        self.content
            .pointer("/chain/currHash")
            .and_then(Value::as_str)
            .or_else(|| self.content.get("hash").and_then(Value::as_str))
    }
}

/// Result of a verify lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub exists: bool,
    pub record: Option<TruthRecord>,
}

impl From<Option<TruthRecord>> for Verification {
    fn from(record: Option<TruthRecord>) -> Self {
        Self {
            exists: record.is_some(),
            record,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestChain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curr_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
}

/// Public view of a truth record, as rendered by verification pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruthManifest {
    pub content_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(rename = "createdAtISO", skip_serializing_if = "Option::is_none")]
    pub created_at_iso: Option<String>,
    pub chain: ManifestChain,
}

fn string_field(content: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| content.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

impl From<&TruthRecord> for TruthManifest {
    fn from(record: &TruthRecord) -> Self {
        let content = &record.content;
        Self {
            content_id: record.content_id.clone(),
            creator_did: string_field(content, &["creatorDid", "creator_did"]),
            media_type: string_field(content, &["mediaType", "media_type"]),
            created_at_iso: string_field(content, &["createdAtISO", "createdAt"]),
            chain: ManifestChain {
                curr_hash: record.current_hash().map(str::to_string),
                prev_hash: content
                    .pointer("/chain/prevHash")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verification_from_option() {
        let v = Verification::from(None);
        assert!(!v.exists);
        assert!(v.record.is_none());
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({"exists": false, "record": null})
        );
    }

    #[test]
    fn test_manifest_from_record() {
        let record = TruthRecord {
            content_id: "c1".into(),
            content: json!({
                "creatorDid": "did:key:z6Mk",
                "mediaType": "image/png",
                "createdAtISO": "2024-05-01T00:00:00Z",
                "chain": {"currHash": "abc", "prevHash": "000"}
            }),
        };
        let manifest = TruthManifest::from(&record);
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["contentId"], "c1");
        assert_eq!(json["creatorDid"], "did:key:z6Mk");
        assert_eq!(json["createdAtISO"], "2024-05-01T00:00:00Z");
        assert_eq!(json["chain"]["currHash"], "abc");
    }

    #[test]
    fn test_current_hash_falls_back_to_hash_field() {
        let record = TruthRecord {
            content_id: "c2".into(),
            content: json!({"hash": "deadbeef"}),
        };
        assert_eq!(record.current_hash(), Some("deadbeef"));
        assert_eq!(TruthManifest::from(&record).chain.curr_hash.as_deref(), Some("deadbeef"));
    }
}
