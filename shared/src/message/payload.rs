//! Wire payloads carried on the bus

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{AppError, ErrorCode};
use crate::models::{EntryKind, NewLedgerEntry, validate_amount};

/// Raw credit/debit event as producers send it
///
/// Every field is optional here so a missing field becomes a validation
/// error naming the field rather than a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEventPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Decimal string; plain JSON numbers are accepted too
    #[serde(default)]
    pub amount: Option<Value>,
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::required(field)),
    }
}

fn parse_amount(value: Option<Value>) -> Result<Decimal, AppError> {
    let raw = match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            return Err(AppError::required("amount"));
        }
        Some(other) => {
            return Err(AppError::with_message(
                ErrorCode::InvalidAmount,
                format!("amount must be a decimal string, got {other}"),
            ));
        }
    };
    let amount = Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).map_err(
        |_| AppError::with_message(ErrorCode::InvalidAmount, format!("invalid amount: {raw}")),
    )?;
    validate_amount(amount)
}

impl LedgerEventPayload {
    /// Validate and convert into an insertable entry of the given kind
    pub fn into_entry(self, kind: EntryKind) -> Result<NewLedgerEntry, AppError> {
        Ok(NewLedgerEntry {
            id: required_text(self.id, "id")?,
            account_id: required_text(self.account_id, "accountId")?,
            amount: parse_amount(self.amount)?,
            kind,
        })
    }

    /// Decode raw bytes and validate in one step
    pub fn decode(bytes: &[u8], kind: EntryKind) -> Result<NewLedgerEntry, AppError> {
        let payload: LedgerEventPayload = serde_json::from_slice(bytes)
            .map_err(|e| AppError::decode(format!("invalid ledger event: {e}")))?;
        payload.into_entry(kind)
    }
}

/// Record published to the dead-letter subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub subject: String,
    pub code: ErrorCode,
    pub reason: String,
    pub payload: String,
    pub attempts: u32,
}

/// Envelope the outbox relay publishes
///
/// Consumers dedupe on `event_id`; the relay may deliver more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedEvent {
    pub event_id: uuid::Uuid,
    pub aggregate_id: String,
    pub topic: String,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    pub payload: Value,
}

impl From<&crate::models::OutboxEvent> for RelayedEvent {
    fn from(event: &crate::models::OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            aggregate_id: event.aggregate_id.clone(),
            topic: event.topic.clone(),
            occurred_at: event.created_at,
            payload: event.payload.clone(),
        }
    }
}

/// Payload of the demo signup event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupEvent {
    /// Unix millis
    pub ts: i64,
}
