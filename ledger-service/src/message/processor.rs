//! Message Processor Trait
//!
//! A processor turns one bus message into a durable effect and reports how
//! the handler should treat the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::message::{BusMessage, LedgerEventPayload};
use shared::models::EntryKind;

use crate::config::ConsumerConfig;
use crate::db::{LedgerStore, RecordOutcome};

/// Result of message processing
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// Message processed successfully
    Success { message: String },
    /// Transient failure, try again after a backoff
    Retry { reason: String },
    /// Permanent failure, dead-letter without retrying
    Failed { code: ErrorCode, reason: String },
    /// Nothing to do (e.g., duplicate)
    Skipped { reason: String },
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::Success { .. })
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, ProcessResult::Retry { .. })
    }

    /// Classify an error: retryable codes retry, everything else fails
    pub fn from_error(err: &AppError) -> Self {
        if err.is_retryable() {
            ProcessResult::Retry {
                reason: err.to_string(),
            }
        } else {
            ProcessResult::Failed {
                code: err.code,
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
pub trait MessageProcessor: Send + Sync {
    /// Subject this processor consumes
    fn subject(&self) -> &'static str;

    /// Process one message
    ///
    /// Must be idempotent: the same message may arrive more than once, and a
    /// `Retry` result leads to the same call being repeated.
    async fn process(&self, msg: &BusMessage) -> Result<ProcessResult, AppError>;

    /// Maximum retry attempts after the first try
    fn max_retries(&self) -> u32 {
        3
    }

    /// First backoff step (in milliseconds); doubles per retry
    fn retry_delay_ms(&self) -> u64 {
        1000
    }
}

/// Credit/debit consumer: decode, validate, record entry + outbox event
pub struct LedgerEntryProcessor {
    kind: EntryKind,
    store: Arc<dyn LedgerStore>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl LedgerEntryProcessor {
    pub fn new(kind: EntryKind, store: Arc<dyn LedgerStore>, config: &ConsumerConfig) -> Self {
        Self {
            kind,
            store,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

#[async_trait]
impl MessageProcessor for LedgerEntryProcessor {
    fn subject(&self) -> &'static str {
        self.kind.subject()
    }

    async fn process(&self, msg: &BusMessage) -> Result<ProcessResult, AppError> {
        if EntryKind::from_subject(&msg.subject) != Some(self.kind) {
            return Ok(ProcessResult::Failed {
                code: ErrorCode::UnknownSubject,
                reason: format!("{} consumer got a message on {}", self.kind, msg.subject),
            });
        }

        let entry = match LedgerEventPayload::decode(&msg.payload, self.kind) {
            Ok(entry) => entry,
            Err(e) => {
                return Ok(ProcessResult::Failed {
                    code: e.code,
                    reason: e.message,
                });
            }
        };

        match self.store.record_entry(&entry).await {
            Ok(RecordOutcome::Inserted { entry, event }) => {
                tracing::info!(
                    entry_id = %entry.id,
                    account_id = %entry.account_id,
                    kind = %entry.kind,
                    event_id = %event.id,
                    "Ledger entry recorded"
                );
                Ok(ProcessResult::Success {
                    message: format!("recorded {}", entry.id),
                })
            }
            Ok(RecordOutcome::Duplicate) => Ok(ProcessResult::Skipped {
                reason: format!("entry {} already recorded", entry.id),
            }),
            Err(e) => Ok(ProcessResult::from_error(&e)),
        }
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_ms
    }
}
