//! Truth registry configuration

use shared::db::DbConfig;
use shared::error::AppError;

/// Truth registry configuration
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
/// | HOST | 0.0.0.0 | |
/// | PORT | 4000 | |
/// | LOG_LEVEL | info | overridden by RUST_LOG |
#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            db: DbConfig::from_lookup(&lookup)?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(4000),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_port_override() {
        let config = Config::from_lookup(|k| match k {
            "DATABASE_URL" => Some("postgres://localhost/truth".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "0.0.0.0");

        let config = Config::from_lookup(|k| match k {
            "DATABASE_URL" => Some("postgres://localhost/truth".into()),
            "PORT" => Some("8080".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_database_url() {
        assert!(Config::from_lookup(|_| None).is_err());
    }
}
