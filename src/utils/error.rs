//! Error types for I/O adapters and on-disk state
//!
//! This module defines the domain errors raised by metadata fetchers,
//! candidate sources and the flat-file stores.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching metadata from an external API
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The requested item does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Map a non-success HTTP status to a fetch error
    pub fn from_status(status: reqwest::StatusCode, what: &str) -> Self {
        match status.as_u16() {
            404 => Self::NotFound(what.to_string()),
            403 | 429 => Self::RateLimit,
            code => Self::ServerError(code),
        }
    }

    /// Check if the failure is transient
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder(),
            Self::RateLimit | Self::Timeout => true,
            Self::ServerError(code) => *code >= 500,
            Self::NotFound(_) | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors raised by the queue, history and lock files
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading a state file failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a state file failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A queue line could not be parsed
    #[error("Invalid queue entry '{line}': {reason}")]
    InvalidEntry { line: String, reason: String },

    /// Another invocation holds the state lock
    #[error("State is locked by another run: {path}")]
    Locked { path: PathBuf },
}

impl StorageError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
