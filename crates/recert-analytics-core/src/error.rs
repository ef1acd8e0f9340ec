//! Error types for recert-analytics-core.

use thiserror::Error;
use uuid::Uuid;

use crate::clustering::ClusterError;
use crate::graduation::Phase;

/// Top-level error type for the analytics engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Clustering error: {0}")]
    ClusterError(#[from] ClusterError),

    #[error("Campaign {0} already has a run in flight")]
    CampaignInFlight(Uuid),

    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Invalid graduation transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CoreError {
    /// Create a ValidationError.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a ConfigError.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
