//! Outbox relay
//!
//! Drains `outbox_events` onto the bus. An event is marked published only
//! after the bus accepted it, so a crash between the two steps re-publishes
//! rather than loses it. Consumers dedupe on `eventId`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use shared::error::{AppError, AppResult};
use shared::message::{BusMessage, RelayedEvent};
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::db::LedgerStore;
use crate::message::Transport;

/// Counters for one relay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub published: usize,
    pub failed: usize,
    /// Published but not marked; the next pass sends these again
    pub mark_failed: usize,
    /// Held back behind an earlier failure on the same aggregate
    pub skipped: usize,
}

impl RelayStats {
    pub fn is_idle(&self) -> bool {
        self.published == 0 && self.failed == 0 && self.skipped == 0
    }

    /// Every event of the pass was published and marked
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.mark_failed == 0
    }
}

pub struct OutboxRelay {
    store: Arc<dyn LedgerStore>,
    transport: Arc<dyn Transport>,
    config: RelayConfig,
}

impl OutboxRelay {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        transport: Arc<dyn Transport>,
        config: RelayConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    /// Publish one batch of unpublished events, oldest first
    ///
    /// A failed publish holds back the remaining events of the same
    /// aggregate until the next pass, keeping per-aggregate order.
    pub async fn run_once(&self) -> AppResult<RelayStats> {
        let events = self.store.fetch_unpublished(self.config.batch_size).await?;
        let mut stats = RelayStats::default();
        let mut blocked: HashSet<String> = HashSet::new();

        for event in &events {
            if blocked.contains(&event.aggregate_id) {
                stats.skipped += 1;
                continue;
            }

            let msg = BusMessage::json(&event.topic, &RelayedEvent::from(event))
                .map_err(|e| AppError::internal(format!("encode outbox event {}: {e}", event.id)))?;

            if let Err(e) = self.transport.publish(msg).await {
                tracing::warn!(
                    event_id = %event.id,
                    aggregate_id = %event.aggregate_id,
                    topic = %event.topic,
                    error = %e,
                    "Outbox publish failed"
                );
                stats.failed += 1;
                blocked.insert(event.aggregate_id.clone());
                continue;
            }

            match self.store.mark_published(event.id, Utc::now()).await {
                Ok(true) => {
                    tracing::debug!(event_id = %event.id, topic = %event.topic, "Outbox event published");
                }
                Ok(false) => {
                    tracing::debug!(event_id = %event.id, "Outbox event already marked by another relay");
                }
                Err(e) => {
                    // published but not marked: the next pass sends it again
                    tracing::warn!(event_id = %event.id, error = %e, "Failed to mark outbox event");
                    stats.mark_failed += 1;
                    blocked.insert(event.aggregate_id.clone());
                }
            }
            stats.published += 1;
        }

        if !stats.is_idle() {
            tracing::info!(
                published = stats.published,
                failed = stats.failed,
                mark_failed = stats.mark_failed,
                skipped = stats.skipped,
                "Outbox relay pass"
            );
        }
        Ok(stats)
    }

    /// Poll until cancelled
    ///
    /// A full, clean batch triggers the next pass immediately; otherwise the
    /// relay sleeps for the poll interval. Store errors are logged and retried
    /// on the next tick.
    pub async fn run(&self, shutdown: CancellationToken) -> AppResult<()> {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Outbox relay started"
        );

        loop {
            let drain_more = match self.run_once().await {
                Ok(stats) => {
                    stats.is_clean() && stats.published as i64 >= self.config.batch_size
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Outbox relay pass failed");
                    false
                }
            };

            if drain_more {
                if shutdown.is_cancelled() {
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!("Outbox relay stopped");
        Ok(())
    }
}
