use std::io;

use thiserror::Error;

/// Everything that can go wrong while setting up or feeding a recorder.
#[derive(Debug, Error)]
pub enum SensorError {
    /// A configured handler identifier has no entry in the registry.
    #[error("handler not found: {0}")]
    HandlerNotFound(String),

    /// An environment / config value could not be parsed.
    #[error("invalid configuration for {key}: {message}")]
    Config { key: String, message: String },

    /// A task tried to report after the page was finalized.
    #[error("task '{task}' reported after the page recorder was finalized")]
    Finalized { task: String },

    /// A task name was first seen with one log-once mode and later with the other.
    #[error("task '{task}' was registered with log_once={expected}")]
    LogOnceMismatch { task: String, expected: bool },

    /// A report handler failed to emit.
    #[error("handler '{handler}' failed to write report: {source}")]
    Handler {
        handler: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SensorError>;
