//! Error types for session construction and persistence.

use thiserror::Error;

/// Rejected session parameters. Raised at construction, never mid-run.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("fault limit must be positive, got {0}")]
    FaultLimit(i64),

    #[error("time limit must be zero (unlimited) or positive, got {0}")]
    TimeLimit(i64),

    #[error("initial speed must be a positive finite number, got {0}")]
    InitialSpeed(f64),

    #[error("play field must have a positive size, got {width}x{height}")]
    PlayField { width: f64, height: f64 },
}

/// Failures reading or writing the save, high-score and settings files.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not resolve a data directory")]
    NoDataDir,
}
