//! Logging Infrastructure

use tracing_subscriber::EnvFilter;

/// Initialize the logger; `RUST_LOG` wins over `log_level`
pub fn init_logger(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,truth_registry={log_level},shared={log_level},tower_http=info"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
