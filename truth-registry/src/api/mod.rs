//! API routes for truth-registry

pub mod health;
pub mod truth;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::TruthRegistry;

pub fn create_router(registry: TruthRegistry) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/truth/register", post(truth::register))
        .route("/api/truth/verify", get(truth::verify))
        .route("/api/truth/manifest", get(truth::manifest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(registry)
}
