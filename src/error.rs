use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while turning configuration into filters.
///
/// Configuration problems are fatal: a logger that was only partially
/// configured is not installed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown level {0:?}")]
    UnknownLevel(String),
    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),
}

/// Runtime failures inside a writer.
///
/// These never reach the logging caller; writers log them through
/// `tracing` and keep going.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("could not open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not rotate {path:?}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no free rotation index for {0:?}")]
    RotationExhausted(PathBuf),
    #[error("write failed: {0}")]
    Write(#[from] io::Error),
    #[error("could not serialise record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Error value handed back by the `warn`/`error`/`critical` entry points so a
/// caller can log and return in one expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoggedError {
    message: String,
}

impl LoggedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
