//! Outbox Event Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::ledger::NewLedgerEntry;
use crate::message::subjects;

/// Domain event awaiting (or done with) publication
///
/// `published_at` moves from `None` to `Some` once and never back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OutboxEvent {
    pub id: Uuid,
    /// Entity the event concerns; relay keeps FIFO per aggregate
    pub aggregate_id: String,
    pub topic: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Outbox row written in the same transaction as its ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEvent {
    pub id: Uuid,
    pub aggregate_id: String,
    pub topic: String,
    pub payload: Value,
}

impl NewOutboxEvent {
    pub fn for_entry(entry: &NewLedgerEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id: entry.account_id.clone(),
            topic: subjects::LEDGER_ENTRY_RECORDED.to_string(),
            payload: json!({
                "id": entry.id,
                "accountId": entry.account_id,
                "amount": entry.amount.to_string(),
                "kind": entry.kind.as_str(),
            }),
        }
    }

    pub fn into_event(self, created_at: DateTime<Utc>) -> OutboxEvent {
        OutboxEvent {
            id: self.id,
            aggregate_id: self.aggregate_id,
            topic: self.topic,
            payload: self.payload,
            created_at,
            published_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;
    use rust_decimal::Decimal;

    #[test]
    fn test_for_entry() {
        let entry = NewLedgerEntry {
            id: "e1".into(),
            account_id: "acc1".into(),
            amount: Decimal::new(1050, 2),
            kind: EntryKind::Credit,
        };
        let event = NewOutboxEvent::for_entry(&entry);
        assert_eq!(event.aggregate_id, "acc1");
        assert_eq!(event.topic, "ledger.entry.recorded.v1");
        assert_eq!(event.payload["id"], "e1");
        assert_eq!(event.payload["amount"], "10.50");
        assert_eq!(event.payload["kind"], "credit");

        let stored = event.into_event(Utc::now());
        assert!(!stored.is_published());
    }
}
