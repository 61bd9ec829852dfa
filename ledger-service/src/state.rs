//! Application state for ledger-service

use std::sync::Arc;

use crate::db::LedgerStore;
use crate::message::Transport;

/// Shared handles injected into HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport }
    }
}
