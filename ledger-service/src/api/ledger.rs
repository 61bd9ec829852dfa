//! Read-only ledger endpoints
//!
//! GET /api/ledger/entries/{id} - a recorded entry
//! GET /api/ledger/outbox       - number of events awaiting the relay

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use shared::error::{AppError, AppResult};
use shared::models::LedgerEntry;

use crate::state::AppState;

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LedgerEntry>> {
    state
        .store
        .get_entry(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("ledger entry {id}")))
}

pub async fn outbox_status(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pending = state.store.count_unpublished().await?;
    Ok(Json(json!({ "pending": pending })))
}
