//! Unified error handling for the repocast crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain errors available
//! where a component needs to match on them.
//!
//! # Architecture
//!
//! - [`RepocastErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use repocast::error::{Error, RepocastErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Next run will retry: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::channels::ChannelError;
pub use crate::llm::LlmError;
pub use crate::utils::error::{FetchError, StorageError};

/// Common trait for repocast error types
pub trait RepocastErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later run may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// LLM oracle errors
    Llm,
    /// Publishing channel errors
    Publishing,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Llm => "llm",
            Self::Publishing => "publishing",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the repocast crate
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata or source fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Queue / history / lock errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// LLM oracle errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Publishing channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Archive template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RepocastErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Llm(e) => e.is_recoverable(),
            Self::Channel(e) => e.is_recoverable(),
            Self::Storage(StorageError::Locked { .. }) => true,
            Self::Storage(_) => false,
            Self::Template(_) => false,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(FetchError::Decode(_)) => ErrorCategory::Parsing,
            Self::Fetch(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Storage(_) | Self::Io(_) | Self::Template(_) => ErrorCategory::Storage,
            Self::Llm(_) => ErrorCategory::Llm,
            Self::Channel(_) => ErrorCategory::Publishing,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let fetch_err = Error::Fetch(FetchError::Timeout);
        assert_eq!(fetch_err.category(), ErrorCategory::Network);

        let decode_err = Error::Fetch(FetchError::Decode("bad json".into()));
        assert_eq!(decode_err.category(), ErrorCategory::Parsing);

        let llm_err = Error::Llm(LlmError::NotConfigured);
        assert_eq!(llm_err.category(), ErrorCategory::Llm);
    }

    #[test]
    fn test_is_recoverable() {
        let fetch_err = Error::Fetch(FetchError::Timeout);
        assert!(fetch_err.is_recoverable());

        let not_found = Error::Fetch(FetchError::NotFound("a/b".into()));
        assert!(!not_found.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let storage_err = StorageError::Locked {
            path: "queue.txt.lock".into(),
        };
        let unified: Error = storage_err.into();
        assert!(matches!(unified, Error::Storage(_)));
        assert!(unified.is_recoverable());
        assert_eq!(unified.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("minimum_stock must be greater than 0");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err: Error = anyhow::anyhow!("root cause")
            .context("Failed to write archive")
            .into();
        assert!(err.to_string().contains("Failed to write archive"));
        assert!(err.to_string().contains("root cause"));
    }
}
