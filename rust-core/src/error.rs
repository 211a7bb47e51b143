//! Error types for analyzer construction and configuration

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectrumError {
    #[error("Analysis window must hold at least 2 samples (got {0})")]
    InvalidWindowSize(usize),

    #[error("Failed to allocate analysis buffers: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("Transform plan has already been released")]
    PlanReleased,

    #[error("Transform failed: {0}")]
    Transform(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
