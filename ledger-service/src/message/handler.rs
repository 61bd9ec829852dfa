//! Message Handler for bus consumers
//!
//! One handler per subject. Messages are processed concurrently (bounded by
//! a semaphore) so one slow write does not hold up the rest of the stream.
//!
//! Features:
//! - Automatic retries with exponential backoff
//! - Dead letter subject for malformed or exhausted messages
//! - Stream end reported as an error so the supervisor resubscribes

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use shared::error::{AppError, ErrorCode};
use shared::message::{BusMessage, DeadLetter, subjects};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::processor::{MessageProcessor, ProcessResult};
use super::transport::Transport;
use crate::config::ConsumerConfig;

/// Subject consumer with retry and dead-letter handling
#[derive(Clone)]
pub struct MessageHandler {
    transport: Arc<dyn Transport>,
    processor: Arc<dyn MessageProcessor>,
    permits: Arc<Semaphore>,
    max_retry_delay_ms: u64,
    shutdown_token: CancellationToken,
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped
pub fn backoff_delay(base_ms: u64, attempt: u32, cap_ms: u64) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor).min(cap_ms))
}

impl MessageHandler {
    pub fn new(
        transport: Arc<dyn Transport>,
        processor: Arc<dyn MessageProcessor>,
        config: &ConsumerConfig,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            transport,
            processor,
            permits: Arc::new(Semaphore::new(config.concurrency)),
            max_retry_delay_ms: config.max_retry_delay_ms,
            shutdown_token,
        }
    }

    pub fn subject(&self) -> &'static str {
        self.processor.subject()
    }

    /// Consume until shutdown
    ///
    /// Returns `Err(SubscribeFailed)` if the subscription cannot be opened
    /// or ends on its own. In-flight messages are drained before returning.
    pub async fn run(&self) -> Result<(), AppError> {
        let subject = self.subject();
        let mut stream = self.transport.subscribe(subject).await?;
        let mut in_flight = JoinSet::new();
        tracing::info!(subject = %subject, "Consumer subscribed");

        let result = loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!(subject = %subject, "Consumer shutting down");
                    break Ok(());
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(subject = %subject, error = %e, "Message task panicked");
                    }
                }

                next = stream.next() => {
                    let Some(msg) = next else {
                        break Err(AppError::with_message(
                            ErrorCode::SubscribeFailed,
                            format!("subscription to {subject} ended"),
                        ));
                    };
                    let permit = tokio::select! {
                        _ = self.shutdown_token.cancelled() => break Ok(()),
                        permit = self.permits.clone().acquire_owned() => permit
                            .map_err(|e| AppError::internal(e.to_string()))?,
                    };
                    let handler = self.clone();
                    in_flight.spawn(async move {
                        let _permit = permit;
                        // failures are logged and dead-lettered inside
                        let _ = handler.handle_message(&msg).await;
                    });
                }
            }
        };

        while in_flight.join_next().await.is_some() {}
        result
    }

    /// Process one message, retrying transient failures
    ///
    /// Returns `Err` when the message was dead-lettered, including a retry
    /// cut short by shutdown.
    pub async fn handle_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        let max_retries = self.processor.max_retries();
        let base_delay = self.processor.retry_delay_ms();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let result = self
                .processor
                .process(msg)
                .await
                .unwrap_or_else(|e| ProcessResult::from_error(&e));

            let reason = match result {
                ProcessResult::Success { message } => {
                    tracing::debug!(subject = %msg.subject, attempt, result = %message, "Message processed");
                    return Ok(());
                }
                ProcessResult::Skipped { reason } => {
                    tracing::info!(subject = %msg.subject, reason = %reason, "Message skipped");
                    return Ok(());
                }
                ProcessResult::Failed { code, reason } => {
                    tracing::warn!(subject = %msg.subject, reason = %reason, "Message rejected");
                    self.send_to_dead_letter(msg, code, &reason, attempt).await;
                    return Err(AppError::with_message(code, reason));
                }
                ProcessResult::Retry { reason } => reason,
            };

            if attempt > max_retries {
                tracing::error!(
                    subject = %msg.subject,
                    attempt,
                    reason = %reason,
                    "Max retries exceeded"
                );
                self.send_to_dead_letter(msg, ErrorCode::DeliveryFailed, &reason, attempt)
                    .await;
                return Err(AppError::delivery(format!("max retries exceeded: {reason}")));
            }

            let delay = backoff_delay(base_delay, attempt, self.max_retry_delay_ms);
            tracing::warn!(
                subject = %msg.subject,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Retrying message processing"
            );
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    // core NATS will not redeliver it, so park it in the dead letter subject
                    let reason = format!("abandoned on shutdown: {reason}");
                    tracing::warn!(subject = %msg.subject, attempt, "Retry abandoned on shutdown");
                    self.send_to_dead_letter(msg, ErrorCode::DeliveryFailed, &reason, attempt)
                        .await;
                    return Err(AppError::delivery(reason));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn send_to_dead_letter(&self, msg: &BusMessage, code: ErrorCode, reason: &str, attempts: u32) {
        tracing::error!(
            subject = %msg.subject,
            reason = %reason,
            payload_len = msg.payload.len(),
            "Sending message to dead letter subject"
        );

        let record = DeadLetter {
            subject: msg.subject.clone(),
            code,
            reason: reason.to_string(),
            payload: msg.payload_lossy(),
            attempts,
        };
        let letter = match BusMessage::json(subjects::LEDGER_DEAD_LETTER, &record) {
            Ok(letter) => letter,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode dead letter");
                return;
            }
        };
        if let Err(e) = self.transport.publish(letter).await {
            tracing::error!(subject = %msg.subject, error = %e, "Failed to publish dead letter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryLedgerStore;
    use crate::message::processor::LedgerEntryProcessor;
    use crate::message::transport::MemoryTransport;
    use shared::models::EntryKind;

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(200, 1, 30_000), Duration::from_millis(200));
        assert_eq!(backoff_delay(200, 3, 30_000), Duration::from_millis(800));
        assert_eq!(backoff_delay(200, 20, 30_000), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(200, 200, 30_000), Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_shutdown_during_retry_dead_letters() {
        let store = Arc::new(MemoryLedgerStore::new());
        store.fail_next_writes(100);
        let transport = MemoryTransport::new();
        let config = ConsumerConfig {
            retry_delay_ms: 10_000,
            ..ConsumerConfig::default()
        };
        let processor = Arc::new(LedgerEntryProcessor::new(EntryKind::Credit, store.clone(), &config));
        let token = CancellationToken::new();
        let handler = MessageHandler::new(Arc::new(transport.clone()), processor, &config, token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let msg = BusMessage::new(
            subjects::LEDGER_CREDIT,
            br#"{"id":"e1","accountId":"acc1","amount":"1"}"#.to_vec(),
        );
        let err = handler.handle_message(&msg).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DeliveryFailed);
        assert_eq!(store.entry_count(), 0);

        let letters = transport.published(subjects::LEDGER_DEAD_LETTER);
        assert_eq!(letters.len(), 1);
        let letter: DeadLetter = letters[0].parse_payload().unwrap();
        assert_eq!(letter.subject, subjects::LEDGER_CREDIT);
        assert_eq!(letter.code, ErrorCode::DeliveryFailed);
        assert_eq!(letter.attempts, 1);
        assert!(letter.reason.starts_with("abandoned on shutdown"));
    }
}
