//! Error types for queue operations.

use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// Every publish attempt against a single provider failed.
    #[error("Publish to '{queue}' failed after {attempts} attempts: {source}")]
    PublishExhausted {
        queue: String,
        attempts: u32,
        #[source]
        source: Box<QueueError>,
    },

    /// Every member of a fan-out publish failed.
    ///
    /// Member errors are logged as they are observed and not carried here.
    #[error("Failed to publish to '{queue}' on any of {provider_count} queue providers")]
    AllProvidersFailed { queue: String, provider_count: usize },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Queue '{queue_name}' is full ({max_size} messages)")]
    QueueFull { queue_name: String, max_size: usize },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Provider error ({provider}): {code} - {message}")]
    ProviderError {
        provider: String,
        code: String,
        message: String,
    },

    #[error("Idempotency store failure: {message}")]
    IdempotencyStore { message: String },

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),
}

impl QueueError {
    /// Check if error is transient and a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::PublishExhausted { source, .. } => source.is_transient(),
            Self::AllProvidersFailed { .. } => true,
            Self::QueueNotFound { .. } => false,
            Self::QueueFull { .. } => true,
            Self::Timeout { .. } => true,
            Self::ConnectionFailed { .. } => true,
            Self::ProviderError { .. } => true, // Provider-specific errors are usually transient
            Self::IdempotencyStore { .. } => true,
            Self::SerializationError(_) => false,
            Self::ConfigurationError(_) => false,
            Self::ValidationError(_) => false,
        }
    }

    /// Number of publish attempts recorded on the error, if any
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::PublishExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        Self::Parsing {
            message: err.to_string(),
        }
    }
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
