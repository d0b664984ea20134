//! Error types for ingredisense
//!
//! Only extraction failures ever reach the caller of `analyze`; every other
//! variant is raised inside a stage and recovered there with a default.

use thiserror::Error;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Label could not be read from the image (fatal for the run)
    #[error("Label extraction failed: {0}")]
    FatalExtraction(String),

    /// Reasoning gateway failures
    #[error("Reasoning gateway error: {0}")]
    Gateway(String),

    /// Encyclopedia or catalog lookup failures
    #[error("Source '{source_name}' degraded: {reason}")]
    DegradedSource { source_name: String, reason: String },

    /// Source answered with a non-success HTTP status
    #[error("Source '{source_name}' returned HTTP {status}")]
    SourceStatus { source_name: String, status: u16 },

    /// Generative output could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline stage ordering violated
    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl AnalysisError {
    /// Shorthand for a degraded source error
    pub fn degraded(source_name: &str, reason: impl Into<String>) -> Self {
        AnalysisError::DegradedSource {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::FatalExtraction(_))
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
