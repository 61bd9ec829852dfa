//! Memory transport (same-process communication)

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use shared::error::AppError;
use shared::message::BusMessage;
use tokio::sync::broadcast;

use super::{Subscription, Transport};

const CHANNEL_CAPACITY: usize = 1024;

/// In-process transport with one broadcast channel per subject
///
/// Keeps a copy of everything published so tests can inspect it.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    channels: Arc<DashMap<String, broadcast::Sender<BusMessage>>>,
    published: Arc<Mutex<Vec<BusMessage>>>,
    failures: Arc<AtomicU32>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published so far on `subject`
    pub fn published(&self, subject: &str) -> Vec<BusMessage> {
        self.published
            .lock()
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.channels
            .get(subject)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Make the next `count` publishes fail with a delivery error
    pub fn fail_next_publishes(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Drop the channel for `subject`, ending every open subscription on it
    pub fn disconnect(&self, subject: &str) {
        self.channels.remove(subject);
    }

    fn sender(&self, subject: &str) -> broadcast::Sender<BusMessage> {
        self.channels
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, msg: BusMessage) -> Result<(), AppError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::delivery(format!(
                "simulated publish failure on {}",
                msg.subject
            )));
        }

        self.published.lock().push(msg.clone());
        if let Some(tx) = self.channels.get(&msg.subject) {
            // no receivers is not an error, same as a subject nobody listens on
            let _ = tx.send(msg);
        }
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, AppError> {
        let rx = self.sender(subject).subscribe();
        let subject = subject.to_string();

        let stream = futures::stream::unfold(rx, move |mut rx| {
            let subject = subject.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(msg) => return Some((msg, rx)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(subject = %subject, skipped, "Subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let transport = MemoryTransport::new();
        let mut sub = transport.subscribe("a.b").await.unwrap();
        assert_eq!(transport.subscriber_count("a.b"), 1);

        transport
            .publish(BusMessage::new("a.b", b"hello".to_vec()))
            .await
            .unwrap();
        transport
            .publish(BusMessage::new("other", b"x".to_vec()))
            .await
            .unwrap();

        let msg = sub.next().await.unwrap();
        assert_eq!(msg.payload, b"hello");
        assert_eq!(transport.published("a.b").len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_ends_stream() {
        let transport = MemoryTransport::new();
        let mut sub = transport.subscribe("a.b").await.unwrap();
        transport.disconnect("a.b");
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let transport = MemoryTransport::new();
        transport.fail_next_publishes(1);
        let err = transport
            .publish(BusMessage::new("a.b", vec![]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(transport.published("a.b").is_empty());
        transport.publish(BusMessage::new("a.b", vec![])).await.unwrap();
        assert_eq!(transport.published("a.b").len(), 1);
    }
}
