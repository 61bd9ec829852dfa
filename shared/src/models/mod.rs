//! Data models
//!
//! Shared between ledger-service and truth-registry.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod ledger;
pub mod outbox;
pub mod truth;

// Re-exports
pub use ledger::*;
pub use outbox::*;
pub use truth::*;
