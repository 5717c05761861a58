//! GitHub search sources

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::CandidateSource;
use crate::metadata::GitHubClient;
use crate::models::{Candidate, Category};

/// Repositories created recently, sorted by stars
pub struct GitHubTrendingSource {
    client: GitHubClient,
    window_days: i64,
    min_stars: u64,
    per_page: usize,
}

impl GitHubTrendingSource {
    pub fn new(client: GitHubClient, window_days: i64, min_stars: u64, per_page: usize) -> Self {
        Self {
            client,
            window_days,
            min_stars,
            per_page,
        }
    }

    pub fn query(&self) -> String {
        let since = (Utc::now() - Duration::days(self.window_days)).format("%Y-%m-%d");
        format!("created:>{since} stars:>{}", self.min_stars)
    }
}

#[async_trait]
impl CandidateSource for GitHubTrendingSource {
    fn name(&self) -> &str {
        "github-trending"
    }

    async fn fetch(&self) -> Vec<Candidate> {
        let query = self.query();
        match self.client.search(&query, self.per_page).await {
            Ok(repos) => repos
                .into_iter()
                .map(|repo| {
                    repo.into_candidate(self.name())
                        .with_category_hint(Category::General)
                })
                .collect(),
            Err(e) => {
                tracing::warn!(source = self.name(), query = %query, error = %e, "Search failed");
                Vec::new()
            }
        }
    }
}

/// Repositories tagged with any of a fixed set of topics
pub struct GitHubTopicSource {
    client: GitHubClient,
    topics: Vec<String>,
    per_page: usize,
    category: Category,
}

impl GitHubTopicSource {
    pub fn new(client: GitHubClient, topics: Vec<String>, per_page: usize, category: Category) -> Self {
        Self {
            client,
            topics,
            per_page,
            category,
        }
    }
}

#[async_trait]
impl CandidateSource for GitHubTopicSource {
    fn name(&self) -> &str {
        "github-topic"
    }

    async fn fetch(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for topic in &self.topics {
            let query = format!("topic:{topic}");
            match self.client.search(&query, self.per_page).await {
                Ok(repos) => candidates.extend(repos.into_iter().map(|repo| {
                    repo.into_candidate(self.name())
                        .with_category_hint(self.category)
                })),
                Err(e) => {
                    tracing::warn!(source = self.name(), topic = %topic, error = %e, "Topic search failed");
                }
            }
        }
        candidates
    }
}
