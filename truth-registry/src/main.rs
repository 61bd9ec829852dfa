//! truth-registry binary

use std::sync::Arc;

use shared::db::connect_pool;
use truth_registry::db::PgTruthStore;
use truth_registry::logger::init_logger;
use truth_registry::{Config, TruthRegistry, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_logger(&config.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting truth-registry");

    let pool = connect_pool(&config.db).await?;
    // both services share one database; each only knows its own migrations
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator.run(&pool).await?;
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgTruthStore::new(pool.clone(), config.db.store_timeout));
    let app = api::create_router(TruthRegistry::new(store));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("truth-registry listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    pool.close().await;
    tracing::info!("truth-registry stopped");
    Ok(())
}
