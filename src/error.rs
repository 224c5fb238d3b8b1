use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy for a benchmark run.
///
/// Configuration errors abort the run before any fork starts. Execution and
/// insufficient-data errors are contained at the fork boundary and end up in
/// the report instead of being raised to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("benchmark execution failed: {0}")]
    Execution(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

impl BenchError {
    pub fn config(message: impl Into<String>) -> Self {
        BenchError::Configuration(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        BenchError::Execution(message.into())
    }
}

pub type BenchResult<T> = Result<T, BenchError>;
