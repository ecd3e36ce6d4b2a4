//! Error types for the Second Brain knowledge service
//!
//! This module provides error handling using thiserror for structured error
//! definitions; the binary wraps these in anyhow at the top level.

use thiserror::Error;

/// Main error type for Second Brain operations
#[derive(Error, Debug)]
pub enum BrainError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema creation failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Request input was missing or invalid
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Knowledge item not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// The AI provider has no API key configured
    #[error("AI provider not configured: {0}")]
    MissingCredentials(String),

    /// The AI provider kept answering "too many requests"
    #[error("AI provider rate limit exceeded after {retries} retries")]
    RateLimited { retries: u32 },

    /// The AI provider rejected the request or returned garbage
    #[error("AI provider error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl BrainError {
    /// Whether the failure originated at the AI provider rather than locally
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            BrainError::MissingCredentials(_)
                | BrainError::RateLimited { .. }
                | BrainError::Provider(_)
                | BrainError::Http(_)
        )
    }
}

/// Result type alias for Second Brain operations
pub type Result<T> = std::result::Result<T, BrainError>;

impl From<libsql::Error> for BrainError {
    fn from(err: libsql::Error) -> Self {
        BrainError::Database(err.to_string())
    }
}

/// Convert anyhow::Error to BrainError
impl From<anyhow::Error> for BrainError {
    fn from(err: anyhow::Error) -> Self {
        BrainError::Other(err.to_string())
    }
}
