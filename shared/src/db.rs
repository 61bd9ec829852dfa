//! PostgreSQL plumbing shared by the services
//!
//! `ServiceError` bridges `sqlx::Error` and [`AppError`] so store code can
//! use `?` on queries and still hand callers a classified error.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

use crate::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection settings read from the environment
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Require TLS to the database (`PGSSLMODE=require` or `DATABASE_TLS=true`)
    pub require_tls: bool,
    pub max_connections: u32,
    /// Longest wait for a pooled connection before failing
    pub acquire_timeout: Duration,
    /// Upper bound on a single store call, transaction included
    pub store_timeout: Duration,
}

impl DbConfig {
    /// Build from a variable lookup (`std::env::var` in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::config("DATABASE_URL must be set"))?;
        let require_tls = lookup("PGSSLMODE").is_some_and(|m| m.eq_ignore_ascii_case("require"))
            || lookup("DATABASE_TLS").is_some_and(|v| v == "true" || v == "1");

        Ok(Self {
            url,
            require_tls,
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_millis(
                lookup("DB_ACQUIRE_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            ),
            store_timeout: Duration::from_millis(
                lookup("STORE_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            ),
        })
    }
}

/// Open the connection pool
///
/// Pool exhaustion queues callers for at most `acquire_timeout`, after which
/// they get `PoolTimedOut` (mapped to a retryable timeout).
pub async fn connect_pool(config: &DbConfig) -> Result<PgPool, BoxError> {
    let mut options = PgConnectOptions::from_str(&config.url)?;
    if config.require_tls {
        options = options.ssl_mode(PgSslMode::Require);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        tls = config.require_tls,
        "Database pool ready"
    );
    Ok(pool)
}

/// Service-layer error
///
/// - `Db`: Database/infrastructure errors (logged, mapped to `DatabaseError`)
/// - `Timeout`: Pool exhaustion or a store call over its deadline
/// - `App`: Business-rule errors (transparent pass-through)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    Timeout(String),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => ServiceError::Timeout("connection pool exhausted".into()),
            other => ServiceError::Db(other.into()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Timeout(msg) => {
                tracing::warn!(reason = %msg, "Store call timed out");
                AppError::timeout(msg)
            }
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::with_message(ErrorCode::DatabaseError, db_err.to_string())
            }
        }
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Run a store operation under a deadline
///
/// Dropping the future on timeout rolls back any open transaction, so a
/// timed-out write leaves nothing behind.
pub async fn with_timeout<T, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(ServiceError::Timeout(format!(
            "{op} exceeded {}ms",
            limit.as_millis()
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://db/app")])).unwrap();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert!(!config.require_tls);
    }

    #[test]
    fn test_db_config_tls_and_missing_url() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/app"),
            ("PGSSLMODE", "require"),
        ]))
        .unwrap();
        assert!(config.require_tls);

        let err = DbConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err: AppError = ServiceError::from(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert!(err.is_retryable());
        assert_eq!(err.public_message(), "db_error");

        let err: AppError = ServiceError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.public_message(), "db_error");
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let err = with_timeout(Duration::from_millis(10), "slow_query", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ServiceError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert!(err.message.contains("slow_query"));
    }
}
