//! Ledger service configuration

use std::time::Duration;

use shared::db::DbConfig;
use shared::error::AppError;

/// Ledger service configuration
///
/// # Environment
///
/// | Variable | Default | Notes |
/// |----------|---------|-------|
/// | DATABASE_URL | required | PostgreSQL URL |
/// | PGSSLMODE / DATABASE_TLS | off | `require` / `true` forces TLS |
/// | DB_MAX_CONNECTIONS | 10 | |
/// | DB_ACQUIRE_TIMEOUT_MS | 5000 | |
/// | STORE_TIMEOUT_MS | 5000 | |
/// | NATS_URL | nats://nats:4222 | |
/// | HOST | 0.0.0.0 | |
/// | PORT | 4100 | health + demo endpoints |
/// | LOG_LEVEL | info | overridden by RUST_LOG |
/// | CONSUMER_CONCURRENCY | 16 | in-flight messages per subject |
/// | CONSUMER_MAX_RETRIES | 5 | |
/// | CONSUMER_RETRY_DELAY_MS | 200 | first backoff step |
/// | RELAY_POLL_INTERVAL_MS | 1000 | |
/// | RELAY_BATCH_SIZE | 100 | |
#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub consumer: ConsumerConfig,
    pub relay: RelayConfig,
}

/// Per-subject consumer tuning
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            max_retries: 5,
            retry_delay_ms: 200,
            max_retry_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
        }
    }
}

fn parsed<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let consumer_defaults = ConsumerConfig::default();
        let relay_defaults = RelayConfig::default();

        let concurrency: usize = parsed(
            lookup("CONSUMER_CONCURRENCY"),
            consumer_defaults.concurrency,
        );
        if concurrency == 0 {
            return Err(AppError::config("CONSUMER_CONCURRENCY must be at least 1"));
        }
        let batch_size: i64 = parsed(lookup("RELAY_BATCH_SIZE"), relay_defaults.batch_size);
        if batch_size <= 0 {
            return Err(AppError::config("RELAY_BATCH_SIZE must be positive"));
        }

        Ok(Self {
            db: DbConfig::from_lookup(&lookup)?,
            nats_url: lookup("NATS_URL").unwrap_or_else(|| "nats://nats:4222".into()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(lookup("PORT"), 4100),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            consumer: ConsumerConfig {
                concurrency,
                max_retries: parsed(
                    lookup("CONSUMER_MAX_RETRIES"),
                    consumer_defaults.max_retries,
                ),
                retry_delay_ms: parsed(
                    lookup("CONSUMER_RETRY_DELAY_MS"),
                    consumer_defaults.retry_delay_ms,
                ),
                max_retry_delay_ms: consumer_defaults.max_retry_delay_ms,
            },
            relay: RelayConfig {
                poll_interval: Duration::from_millis(parsed(
                    lookup("RELAY_POLL_INTERVAL_MS"),
                    1000,
                )),
                batch_size,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        Config::from_lookup(|k| map.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/ledger")]).unwrap();
        assert_eq!(config.nats_url, "nats://nats:4222");
        assert_eq!(config.port, 4100);
        assert_eq!(config.consumer.concurrency, 16);
        assert_eq!(config.relay.batch_size, 100);
        assert_eq!(config.relay.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/ledger"),
            ("NATS_URL", "nats://127.0.0.1:4222"),
            ("PORT", "9000"),
            ("CONSUMER_CONCURRENCY", "4"),
            ("RELAY_POLL_INTERVAL_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.nats_url, "nats://127.0.0.1:4222");
        assert_eq!(config.port, 9000);
        assert_eq!(config.consumer.concurrency, 4);
        assert_eq!(config.relay.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/ledger"),
            ("CONSUMER_CONCURRENCY", "0"),
        ])
        .unwrap_err();
        assert!(err.message.contains("CONSUMER_CONCURRENCY"));
    }
}
