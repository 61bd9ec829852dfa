//! ledger-service binary
//!
//! config → logger → pool → migrations → NATS → consumers + relay → HTTP,
//! then on ctrl-c: stop HTTP, stop tasks, close NATS, close pool.

use std::sync::Arc;

use ledger_service::db::PgLedgerStore;
use ledger_service::logger::init_logger;
use ledger_service::message::{NatsTransport, Transport};
use ledger_service::tasks::{BackgroundTasks, RestartPolicy};
use ledger_service::{AppState, Config, api, spawn_pipeline};
use shared::db::connect_pool;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_logger(&config.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ledger-service");

    let pool = connect_pool(&config.db).await?;
    // both services share one database; each only knows its own migrations
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator.run(&pool).await?;
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgLedgerStore::new(pool.clone(), config.db.store_timeout));
    let transport = Arc::new(NatsTransport::connect(&config.nats_url).await?);

    let mut tasks = BackgroundTasks::new();
    spawn_pipeline(
        &mut tasks,
        store.clone(),
        transport.clone(),
        &config.consumer,
        &config.relay,
        RestartPolicy::default(),
    );
    tasks.log_summary();

    let app = api::create_router(AppState::new(store, transport.clone()));
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ledger-service HTTP listening on {addr}");

    let shutdown = tasks.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
                _ = shutdown.cancelled() => {}
            }
        })
        .await?;

    // logs any task that died before the signal
    tasks.check_health();
    tasks.shutdown().await;
    if let Err(e) = transport.close().await {
        tracing::warn!(error = %e, "NATS close failed");
    }
    pool.close().await;
    tracing::info!("ledger-service stopped");
    Ok(())
}
