//! Full metadata for queued items
//!
//! The publisher calls a [`MetadataFetcher`] for the dequeued entry; the
//! [`CategoryRouter`] sends model-hub entries to the Hugging Face client and
//! everything else to GitHub.

pub mod github;
pub mod huggingface;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::models::{Category, FullRecord};
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

pub use github::GitHubClient;
pub use huggingface::HuggingFaceClient;

/// Fetches the full descriptive record for a queued URL
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// `FetchError::NotFound` when the item no longer exists
    async fn fetch(&self, url: &str, category: Category) -> Result<FullRecord, FetchError>;
}

/// Routes each category to its fetcher, retrying transient failures
pub struct CategoryRouter {
    github: Arc<dyn MetadataFetcher>,
    model_hub: Arc<dyn MetadataFetcher>,
    retry: RetryConfig,
}

impl CategoryRouter {
    pub fn new(github: Arc<dyn MetadataFetcher>, model_hub: Arc<dyn MetadataFetcher>) -> Self {
        Self {
            github,
            model_hub,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl MetadataFetcher for CategoryRouter {
    async fn fetch(&self, url: &str, category: Category) -> Result<FullRecord, FetchError> {
        let fetcher = match category {
            Category::ModelHub => &self.model_hub,
            Category::General | Category::Astronomy => &self.github,
        };

        let mut record = with_retry_if(
            &self.retry,
            || fetcher.fetch(url, category),
            FetchError::is_recoverable,
        )
        .await?;
        record.category = Some(category);
        Ok(record)
    }
}

/// HTTP client shared by the API adapters
pub fn http_client(config: &Config) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .timeout(config.request_timeout())
        .gzip(true)
        .user_agent(&config.http.user_agent)
        .build()?)
}

fn map_send_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}

/// Send a request and decode a JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    what: &str,
) -> Result<T, FetchError> {
    let response = request.send().await.map_err(map_send_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::from_status(status, what));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::Decode(format!("{what}: {e}")))
}

/// Send a request and return the body text; 404 yields `None`
pub(crate) async fn get_optional_text(
    request: RequestBuilder,
    what: &str,
) -> Result<Option<String>, FetchError> {
    let response = request.send().await.map_err(map_send_error)?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(FetchError::from_status(status, what));
    }
    Ok(Some(response.text().await.map_err(map_send_error)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(&'static str);

    #[async_trait]
    impl MetadataFetcher for Fixed {
        async fn fetch(&self, url: &str, _category: Category) -> Result<FullRecord, FetchError> {
            Ok(FullRecord {
                url: url.to_string(),
                full_name: self.0.to_string(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_router_dispatches_by_category() {
        let router = CategoryRouter::new(Arc::new(Fixed("github")), Arc::new(Fixed("hub")))
            .with_retry(RetryConfig::immediate(0));

        let record = router
            .fetch("https://huggingface.co/org/model", Category::ModelHub)
            .await
            .unwrap();
        assert_eq!(record.full_name, "hub");
        assert_eq!(record.category, Some(Category::ModelHub));

        let record = router
            .fetch("https://github.com/a/b", Category::Astronomy)
            .await
            .unwrap();
        assert_eq!(record.full_name, "github");
        assert_eq!(record.category(), Category::Astronomy);
    }

    struct Flaky {
        calls: AtomicUsize,
        error: fn() -> FetchError,
    }

    #[async_trait]
    impl MetadataFetcher for Flaky {
        async fn fetch(&self, url: &str, _category: Category) -> Result<FullRecord, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err((self.error)());
            }
            Ok(FullRecord {
                url: url.to_string(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_router_retries_only_recoverable_errors() {
        let timeout = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            error: || FetchError::Timeout,
        });
        let router = CategoryRouter::new(timeout.clone(), Arc::new(Fixed("hub")))
            .with_retry(RetryConfig::immediate(2));
        assert!(router.fetch("https://github.com/a/b", Category::General).await.is_ok());
        assert_eq!(timeout.calls.load(Ordering::SeqCst), 2);

        let missing = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            error: || FetchError::NotFound("a/b".into()),
        });
        let router = CategoryRouter::new(missing.clone(), Arc::new(Fixed("hub")))
            .with_retry(RetryConfig::immediate(2));
        assert!(matches!(
            router.fetch("https://github.com/a/b", Category::General).await,
            Err(FetchError::NotFound(_))
        ));
        assert_eq!(missing.calls.load(Ordering::SeqCst), 1);
    }
}
