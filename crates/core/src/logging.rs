use thiserror::Error;
use tracing::Level;

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level `{0}`")]
    InvalidLevel(String),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

pub fn max_level(config: &LoggingConfig) -> Result<Level, LoggingError> {
    let level = config.level.trim();
    let level =
        if config.debug_wire && !level.eq_ignore_ascii_case("trace") { "debug" } else { level };
    level.parse::<Level>().map_err(|_| LoggingError::InvalidLevel(config.level.clone()))
}

/// Installs the process-wide fmt subscriber. Call once, after config is loaded.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let log_level = max_level(config)?;
    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|_| LoggingError::AlreadyInitialized)
}
