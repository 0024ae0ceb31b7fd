//! Tracing subscriber bootstrap.
//!
//! Supervisor diagnostics go to stderr so stdout stays reserved for the
//! multiplexed child output.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level `{level}`: {reason}")]
    InvalidLevel { level: String, reason: String },

    #[error("init logging error: {0}")]
    TryInit(String),
}

/// Initializes the global subscriber at `level` for this crate, keeping
/// dependencies quiet unless `RUST_LOG` says otherwise.
pub fn try_init(level: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("procvd={level}")))
        .map_err(|err| LoggingError::InvalidLevel {
            level: level.to_string(),
            reason: err.to_string(),
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| LoggingError::TryInit(err.to_string()))
}
