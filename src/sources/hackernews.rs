//! Hacker News top stories that link to GitHub repositories
//!
//! Story lookups are one request each, so they go through a `governor`
//! limiter before hitting the Firebase API.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::OnceLock;

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use super::CandidateSource;
use crate::config::HackerNewsConfig;
use crate::metadata::{get_json, GitHubClient};
use crate::models::{Candidate, Category};
use crate::utils::error::FetchError;

fn github_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https?://github\.com/([^/\s?#]+/[^/\s?#]+)/?").expect("valid regex")
    })
}

/// `owner/repo` of a GitHub link, if the URL is one
pub fn github_repo_path(url: &str) -> Option<String> {
    let captures = github_link().captures(url)?;
    let path = captures.get(1)?.as_str().trim_end_matches(".git");
    Some(path.to_string())
}

#[derive(Debug, Deserialize)]
struct Story {
    #[serde(rename = "type", default)]
    kind: String,
    url: Option<String>,
}

pub struct HackerNewsSource {
    client: Client,
    github: GitHubClient,
    api_base: String,
    top_stories: usize,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HackerNewsSource {
    pub fn new(client: Client, github: GitHubClient, config: &HackerNewsConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            client,
            github,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            top_stories: config.top_stories,
            rate_limiter: RateLimiter::direct(Quota::per_second(rate)),
        }
    }

    async fn story_ids(&self) -> Result<Vec<u64>, FetchError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}/topstories.json", self.api_base);
        let ids: Vec<u64> = get_json(self.client.get(url), "top stories").await?;
        Ok(ids.into_iter().take(self.top_stories).collect())
    }

    async fn story(&self, id: u64) -> Result<Option<Story>, FetchError> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}/item/{id}.json", self.api_base);
        get_json(self.client.get(url), &format!("item {id}")).await
    }

    /// Distinct `owner/repo` paths linked from current top stories
    pub async fn linked_repos(&self) -> Result<Vec<String>, FetchError> {
        let mut seen = HashSet::new();
        let mut repos = Vec::new();

        for id in self.story_ids().await? {
            let story = match self.story(id).await {
                Ok(Some(story)) => story,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(id, error = %e, "Skipping story");
                    continue;
                }
            };
            if story.kind != "story" {
                continue;
            }
            let Some(path) = story.url.as_deref().and_then(github_repo_path) else {
                continue;
            };
            if seen.insert(path.to_lowercase()) {
                repos.push(path);
            }
        }

        Ok(repos)
    }
}

#[async_trait]
impl CandidateSource for HackerNewsSource {
    fn name(&self) -> &str {
        "hackernews"
    }

    async fn fetch(&self) -> Vec<Candidate> {
        let repos = match self.linked_repos().await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::warn!(source = self.name(), error = %e, "Top stories unavailable");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for path in repos {
            let Some((owner, name)) = path.split_once('/') else {
                continue;
            };
            match self.github.repo(owner, name).await {
                Ok(repo) => candidates.push(
                    repo.into_candidate(self.name())
                        .with_category_hint(Category::General),
                ),
                Err(e) => tracing::warn!(repo = %path, error = %e, "Linked repository unavailable"),
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_repo_path() {
        assert_eq!(
            github_repo_path("https://github.com/octo/cat").as_deref(),
            Some("octo/cat")
        );
        assert_eq!(
            github_repo_path("http://github.com/octo/cat/tree/main/src").as_deref(),
            Some("octo/cat")
        );
        assert_eq!(
            github_repo_path("https://github.com/octo/cat.git").as_deref(),
            Some("octo/cat")
        );
        assert_eq!(github_repo_path("https://github.com/octo"), None);
        assert_eq!(github_repo_path("https://example.com/octo/cat"), None);
    }
}
