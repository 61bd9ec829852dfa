//! Message bus types
//!
//! Shared by the bus transports (NATS, in-memory), the ledger consumers and
//! the outbox relay.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod payload;
pub use payload::*;

/// Subject names used on the bus
pub mod subjects {
    /// Inbound credit events
    pub const LEDGER_CREDIT: &str = "ledger.credit.v1";
    /// Inbound debit events
    pub const LEDGER_DEBIT: &str = "ledger.debit.v1";
    /// Outbound events relayed from the outbox
    pub const LEDGER_ENTRY_RECORDED: &str = "ledger.entry.recorded.v1";
    /// Messages the consumer could not process
    pub const LEDGER_DEAD_LETTER: &str = "ledger.dlq.v1";
    /// Demo signup event
    pub const USER_SIGNUP: &str = "user.signup.v1";
}

/// A raw message as it travels over a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl BusMessage {
    pub fn new(subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            payload,
            received_at: Utc::now(),
        }
    }

    /// Serialize `data` as JSON into a new message
    pub fn json<T: Serialize>(
        subject: impl Into<String>,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(subject, serde_json::to_vec(data)?))
    }

    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Payload as text for logs and dead-letter records
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_json_message() {
        let msg = BusMessage::json(subjects::USER_SIGNUP, &json!({"ts": 1})).unwrap();
        assert_eq!(msg.subject, "user.signup.v1");
        let v: Value = msg.parse_payload().unwrap();
        assert_eq!(v["ts"], 1);
    }

    #[test]
    fn test_payload_lossy() {
        let msg = BusMessage::new(subjects::LEDGER_CREDIT, vec![b'{', 0xff]);
        assert_eq!(msg.payload_lossy(), "{\u{fffd}");
    }
}
