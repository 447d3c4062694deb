//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] bridge_feed::FeedError),

    #[error("Chain error: {0}")]
    Chain(#[from] bridge_chain::ChainError),

    #[error("Key error: {0}")]
    Key(#[from] bridge_chain::KeyError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] bridge_telemetry::TelemetryError),

    #[error("Exchange feed disconnected before a report could be made")]
    FeedDisconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
