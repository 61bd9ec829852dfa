//! HTTP surface of ledger-service

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ledger_service::db::{LedgerStore, MemoryLedgerStore};
use ledger_service::message::MemoryTransport;
use ledger_service::{AppState, api};
use rust_decimal::Decimal;
use serde_json::Value;
use shared::message::{SignupEvent, subjects};
use shared::models::{EntryKind, NewLedgerEntry};
use tower::ServiceExt;

fn app() -> (Router, Arc<MemoryLedgerStore>, MemoryTransport) {
    let store = Arc::new(MemoryLedgerStore::new());
    let transport = MemoryTransport::new();
    let router = api::create_router(AppState::new(store.clone(), Arc::new(transport.clone())));
    (router, store, transport)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _, _) = app();
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn demo_signup_publishes_event() {
    let (app, _, transport) = app();
    let req = Request::builder()
        .method("POST")
        .uri("/demo/signup")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["accepted"], true);

    let published = transport.published(subjects::USER_SIGNUP);
    assert_eq!(published.len(), 1);
    let event: SignupEvent = published[0].parse_payload().unwrap();
    assert!(event.ts > 0);
}

#[tokio::test]
async fn demo_signup_surfaces_bus_failure() {
    let (app, _, transport) = app();
    transport.fail_next_publishes(1);
    let req = Request::builder()
        .method("POST")
        .uri("/demo/signup")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn entry_lookup_and_outbox_status() {
    let (app, store, _) = app();

    let (status, body) = send(app.clone(), get("/api/ledger/entries/e1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");

    store
        .record_entry(&NewLedgerEntry {
            id: "e1".into(),
            account_id: "acc1".into(),
            amount: Decimal::new(1050, 2),
            kind: EntryKind::Debit,
        })
        .await
        .unwrap();

    let (status, body) = send(app.clone(), get("/api/ledger/entries/e1")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["account_id"], "acc1");
    assert_eq!(json["amount"], "10.50");
    assert_eq!(json["kind"], "debit");

    let (status, body) = send(app, get("/api/ledger/outbox")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["pending"], 1);
}
