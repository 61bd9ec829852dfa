//! ledger-service: credit/debit consumers, ledger store and outbox relay
//!
//! ```text
//!  bus ──► consumers ──► ledger_entries + outbox_events (one transaction)
//!                                       │
//!                         OutboxRelay ◄─┘ ──► bus (ledger.entry.recorded.v1)
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod logger;
pub mod message;
pub mod relay;
pub mod state;
pub mod tasks;

use std::sync::Arc;

use shared::models::EntryKind;

use crate::config::{ConsumerConfig, RelayConfig};
use crate::db::LedgerStore;
use crate::message::{LedgerEntryProcessor, MessageHandler, Transport};
use crate::relay::OutboxRelay;
use crate::tasks::{BackgroundTasks, RestartPolicy, TaskKind};

pub use config::Config;
pub use state::AppState;

fn consumer_task_name(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Credit => "consumer.credit",
        EntryKind::Debit => "consumer.debit",
    }
}

/// Spawn the credit and debit consumers and the outbox relay, each under
/// its own supervisor
pub fn spawn_pipeline(
    tasks: &mut BackgroundTasks,
    store: Arc<dyn LedgerStore>,
    transport: Arc<dyn Transport>,
    consumer: &ConsumerConfig,
    relay: &RelayConfig,
    policy: RestartPolicy,
) {
    for kind in EntryKind::all() {
        let processor = Arc::new(LedgerEntryProcessor::new(kind, store.clone(), consumer));
        let handler = MessageHandler::new(
            transport.clone(),
            processor,
            consumer,
            tasks.shutdown_token(),
        );
        tasks.spawn_supervised(consumer_task_name(kind), TaskKind::Listener, policy, move || {
            let handler = handler.clone();
            async move { handler.run().await }
        });
    }

    let relay = Arc::new(OutboxRelay::new(store, transport, relay.clone()));
    let token = tasks.shutdown_token();
    tasks.spawn_supervised("outbox_relay", TaskKind::Periodic, policy, move || {
        let relay = relay.clone();
        let token = token.clone();
        async move { relay.run(token).await }
    });
}
