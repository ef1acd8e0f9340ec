//! Clustering error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("population too small to cluster: need {required}, have {actual}")]
    InsufficientPopulation { required: usize, actual: usize },

    #[error("invalid clustering parameter: {0}")]
    InvalidParameter(String),

    #[error("algorithm produced a degenerate partition: {0}")]
    DegeneratePartition(String),
}

impl ClusterError {
    pub fn insufficient_population(required: usize, actual: usize) -> Self {
        Self::InsufficientPopulation { required, actual }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}
