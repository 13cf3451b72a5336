//! Process-wide tracing setup.
//!
//! `log` records emitted by the store, database and migrations are bridged
//! into the same subscriber through `tracing-log`.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::LoggingConfig;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInstalled,

    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level).map_err(|e| LoggingError::Filter {
        filter: config.level.clone(),
        message: e.to_string(),
    })
}

/// Installs the global subscriber. Call once at startup.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    if config.json {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true));
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|_| LoggingError::AlreadyInstalled)?;
    } else {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(false).compact());
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|_| LoggingError::AlreadyInstalled)?;
    }

    tracing_log::LogTracer::init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            json: false,
        }
    }

    #[test]
    #[serial]
    fn test_build_filter_accepts_directives() {
        std::env::remove_var("RUST_LOG");
        assert!(build_filter(&config("musewave=debug,info")).is_ok());
    }

    #[test]
    #[serial]
    fn test_build_filter_rejects_garbage() {
        std::env::remove_var("RUST_LOG");
        assert!(matches!(
            build_filter(&config("musewave=notalevel")),
            Err(LoggingError::Filter { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_config() {
        std::env::set_var("RUST_LOG", "warn");
        let filter = build_filter(&config("musewave=notalevel"));
        std::env::remove_var("RUST_LOG");

        let filter = filter.unwrap();
        assert_eq!(filter.to_string(), "warn");
    }
}
