//! API routes for ledger-service

pub mod demo;
pub mod health;
pub mod ledger;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/demo/signup", post(demo::signup))
        .route("/api/ledger/entries/{id}", get(ledger::get_entry))
        .route("/api/ledger/outbox", get(ledger::outbox_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
