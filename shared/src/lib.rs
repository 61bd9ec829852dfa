//! Shared types for the provenance ledger services
//!
//! Error taxonomy, domain models and bus message types used by both
//! ledger-service and truth-registry. The `db` feature adds PostgreSQL
//! plumbing and `sqlx::FromRow` derives.

pub mod error;
pub mod message;
pub mod models;

#[cfg(feature = "db")]
pub mod db;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use message::BusMessage;
