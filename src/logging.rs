//! Tracing subscriber setup.

use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Output format of the log lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
            service_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

impl LoggingConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let format = match env::var("LOG_FORMAT").map(|v| v.to_lowercase()) {
            Ok(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            format,
            filter,
            ..Self::default()
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber was already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()?,
    }

    info!(
        service_name = %config.service_name,
        service_version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_logging_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();

        unsafe {
            env::set_var("LOG_FORMAT", "JSON");
            env::set_var("RUST_LOG", "livis_proxy=debug");
        }

        let config = LoggingConfig::from_env();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "livis_proxy=debug");
        assert_eq!(config.service_name, "livis-proxy");

        unsafe {
            env::remove_var("LOG_FORMAT");
            env::remove_var("RUST_LOG");
        }

        let config = LoggingConfig::from_env();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.filter, "info");
    }
}
