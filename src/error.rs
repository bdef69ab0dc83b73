// src/error.rs

//! Unified error handling for the enrichment pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV read/write failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Retryable fetch failure (rate limit, timeout, server error)
    #[error("Transient fetch error for {context}: {message}")]
    Transient { context: String, message: String },

    /// Non-retryable fetch failure (bad request, 404, ...)
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },

    /// A fetched or cached artifact could not be parsed
    #[error("Malformed artifact {context}: {message}")]
    Malformed { context: String, message: String },

    /// Failed to persist a stage output snapshot (fatal for the run)
    #[error("Snapshot write failed for {path}: {message}")]
    Snapshot { path: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a retryable fetch error.
    pub fn transient(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transient {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a non-retryable fetch error.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed-artifact error.
    pub fn malformed(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Malformed {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a snapshot persistence error.
    pub fn snapshot(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this failure is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(AppError::transient("k", "429").is_transient());
        assert!(!AppError::fetch("k", "404").is_transient());
        assert!(!AppError::validation("bad").is_transient());
        assert!(!AppError::malformed("k", "no cards").is_transient());
    }
}
