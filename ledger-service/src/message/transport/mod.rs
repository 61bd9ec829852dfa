//! Bus transport abstraction
//!
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │
//!         └────────┬───────────┘
//!                  │
//!        ┌─────────┴─────────┐
//!        ▼                   ▼
//!  NatsTransport       MemoryTransport
//!  (core NATS)         (same process)
//! ```
//!
//! Delivery is at-most-once per subscriber; consumers compensate with
//! in-process retries and idempotent writes.

mod memory;
mod nats;

pub use memory::MemoryTransport;
pub use nats::NatsTransport;

use async_trait::async_trait;
use futures::stream::BoxStream;
use shared::error::AppError;
use shared::message::BusMessage;

/// Stream of messages received on one subject; ends when the connection or
/// subscription goes away
pub type Subscription = BoxStream<'static, BusMessage>;

#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Publish a message; returns once the bus has accepted it
    async fn publish(&self, msg: BusMessage) -> Result<(), AppError>;

    /// Subscribe to a subject
    async fn subscribe(&self, subject: &str) -> Result<Subscription, AppError>;

    /// Flush pending writes and release the connection
    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}
