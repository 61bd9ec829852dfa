//! Bus consumers and transports
//!
//! ```text
//!  ledger.credit.v1 ──► MessageHandler ──► LedgerEntryProcessor ──► LedgerStore
//!  ledger.debit.v1  ──► MessageHandler ──┘         │
//!                                                  └─ failures ──► ledger.dlq.v1
//! ```

pub mod handler;
pub mod processor;
pub mod transport;

pub use handler::MessageHandler;
pub use processor::{LedgerEntryProcessor, MessageProcessor, ProcessResult};
pub use transport::{MemoryTransport, NatsTransport, Subscription, Transport};
