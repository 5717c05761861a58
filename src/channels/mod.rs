//! Publishing channels
//!
//! Each social destination implements [`Channel`]. Channels are independent:
//! the publisher attempts every one of them and records a [`ChannelOutcome`]
//! per channel, so a failure here never stops the run.

pub mod bluesky;
pub mod twitter;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Asset, ChannelReceipt, PostDraft};

pub use bluesky::BlueskyChannel;
pub use twitter::TwitterChannel;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur during channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Missing or invalid credentials
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Authentication rejected by the platform
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Platform rejected the request
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Channel temporarily unavailable
    #[error("Channel temporarily unavailable: {0}")]
    Unavailable(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Reading an attachment failed
    #[error("Attachment error: {0}")]
    Attachment(#[from] std::io::Error),
}

impl ChannelError {
    /// Whether a later run could succeed without operator action
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::Unavailable(_) | Self::RateLimited(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::InvalidConfig(_)
            | Self::Unauthorized(_)
            | Self::SerializationError(_)
            | Self::Attachment(_) => false,
        }
    }

    /// Classify a non-success HTTP response
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status.as_u16() {
            401 | 403 => Self::Unauthorized(message),
            429 => Self::RateLimited(message),
            502..=504 => Self::Unavailable(message),
            code => Self::Rejected {
                status: code,
                message,
            },
        }
    }
}

/// Turn a non-2xx response into a `ChannelError`
pub(crate) async fn ensure_success(response: reqwest::Response) -> ChannelResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::from_status(status, crate::utils::truncate_text(&body, 300)))
}

/// Result of attempting one channel during a publish run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel: String,
    pub receipt: Option<ChannelReceipt>,
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ChannelOutcome {
    pub fn success(receipt: ChannelReceipt) -> Self {
        Self {
            channel: receipt.channel.clone(),
            receipt: Some(receipt),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn failure(channel: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            receipt: None,
            error: Some(error.into()),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.receipt.is_some()
    }
}

impl fmt::Display for ChannelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.receipt, &self.error) {
            (Some(receipt), _) => write!(f, "[SUCCESS] {}: {}", self.channel, receipt.url),
            (None, Some(error)) => write!(f, "[FAILED] {}: {error}", self.channel),
            (None, None) => write!(f, "[FAILED] {}", self.channel),
        }
    }
}

/// A social publishing destination
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name used in logs and receipts
    fn name(&self) -> &str;

    /// Publish one post, optionally with an image
    async fn publish(&self, draft: &PostDraft, asset: Option<&Asset>) -> ChannelResult<ChannelReceipt>;
}

/// Read the attachment that fits social size limits, if any
pub(crate) async fn read_social_image(asset: Option<&Asset>) -> ChannelResult<Option<(Vec<u8>, String)>> {
    let Some(path) = asset.and_then(|a| a.social_path.as_ref()) else {
        return Ok(None);
    };

    let bytes = tokio::fs::read(path).await?;
    let mime = match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    Ok(Some((bytes, mime.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        let outcome = ChannelOutcome::success(ChannelReceipt {
            channel: "bluesky".into(),
            url: "https://bsky.app/profile/me/post/1".into(),
        });
        assert!(outcome.succeeded());
        assert_eq!(outcome.channel, "bluesky");
        assert!(outcome.to_string().starts_with("[SUCCESS] bluesky"));
    }

    #[test]
    fn test_outcome_failure() {
        let outcome = ChannelOutcome::failure("twitter", "403 Forbidden");
        assert!(!outcome.succeeded());
        assert_eq!(outcome.to_string(), "[FAILED] twitter: 403 Forbidden");
    }

    #[test]
    fn test_error_from_status() {
        let err = ChannelError::from_status(reqwest::StatusCode::FORBIDDEN, "no");
        assert!(matches!(err, ChannelError::Unauthorized(_)));
        assert!(!err.is_recoverable());

        let err = ChannelError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow");
        assert!(err.is_recoverable());

        let err = ChannelError::from_status(reqwest::StatusCode::BAD_REQUEST, "bad");
        assert!(matches!(err, ChannelError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_read_social_image_without_asset() {
        assert!(read_social_image(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_social_image_detects_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo-hero.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let asset = Asset {
            source_url: "https://example.com/a.png".into(),
            original_path: path.clone(),
            social_path: Some(path),
        };

        let (bytes, mime) = read_social_image(Some(&asset)).await.unwrap().unwrap();
        assert_eq!(bytes, b"\x89PNG");
        assert_eq!(mime, "image/png");
    }
}
