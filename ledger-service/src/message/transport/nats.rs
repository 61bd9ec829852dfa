//! NATS transport

use async_trait::async_trait;
use futures::StreamExt;
use shared::error::{AppError, ErrorCode};
use shared::message::BusMessage;

use super::{Subscription, Transport};

#[derive(Debug, Clone)]
pub struct NatsTransport {
    client: async_nats::Client,
}

impl NatsTransport {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = async_nats::connect(url).await.map_err(|e| {
            AppError::with_message(
                ErrorCode::NetworkError,
                format!("Failed to connect to NATS at {url}: {e}"),
            )
        })?;
        tracing::info!(url = %url, "Connected to NATS");
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn publish(&self, msg: BusMessage) -> Result<(), AppError> {
        let subject = msg.subject;
        self.client
            .publish(subject.clone(), msg.payload.into())
            .await
            .map_err(|e| AppError::delivery(format!("publish to {subject} failed: {e}")))?;
        // publish only buffers; flush so a returned Ok means the server has it
        self.client
            .flush()
            .await
            .map_err(|e| AppError::delivery(format!("flush after {subject} failed: {e}")))
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, AppError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| {
                AppError::with_message(
                    ErrorCode::SubscribeFailed,
                    format!("subscribe to {subject} failed: {e}"),
                )
            })?;

        Ok(subscriber
            .map(|m| BusMessage::new(m.subject.to_string(), m.payload.to_vec()))
            .boxed())
    }

    async fn close(&self) -> Result<(), AppError> {
        self.client
            .flush()
            .await
            .map_err(|e| AppError::delivery(format!("final flush failed: {e}")))
    }
}
