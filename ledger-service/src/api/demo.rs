//! POST /demo/signup - publish a signup event for the onboarding workflow

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use shared::error::{AppError, AppResult};
use shared::message::{BusMessage, SignupEvent, subjects};

use crate::state::AppState;

pub async fn signup(State(state): State<AppState>) -> AppResult<(StatusCode, Json<Value>)> {
    let event = SignupEvent {
        ts: chrono::Utc::now().timestamp_millis(),
    };
    let msg = BusMessage::json(subjects::USER_SIGNUP, &event)
        .map_err(|e| AppError::internal(e.to_string()))?;
    state.transport.publish(msg).await?;

    tracing::info!(ts = event.ts, "Signup event published");
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}
