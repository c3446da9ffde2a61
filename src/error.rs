// src/error.rs

//! Unified error handling for the crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP session could not be constructed; aborts the whole run
    #[error("Session error after {attempts} attempts: {message}")]
    Session { attempts: u32, message: String },

    /// A single page could not be fetched
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Expected markup is missing from a fetched page
    #[error("Extraction error for {context}: {message}")]
    Extraction { context: String, message: String },

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a session construction error.
    pub fn session(attempts: u32, message: impl fmt::Display) -> Self {
        Self::Session {
            attempts,
            message: message.to_string(),
        }
    }

    /// Create a fetch error for the given request target.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction error with context.
    pub fn extraction(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error stays inside a single fan-out task.
    pub fn is_task_level(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Extraction { .. } | Self::Task(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_carries_url() {
        let err = AppError::fetch("https://example.com/jobs?x=1&page=2", "connection refused");
        assert_eq!(
            err.to_string(),
            "Fetch error for https://example.com/jobs?x=1&page=2: connection refused"
        );
    }

    #[test]
    fn test_task_level_classification() {
        assert!(AppError::fetch("u", "m").is_task_level());
        assert!(AppError::extraction("c", "m").is_task_level());
        assert!(!AppError::session(10, "m").is_task_level());
        assert!(!AppError::config("m").is_task_level());
    }
}
