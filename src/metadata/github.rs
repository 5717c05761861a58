//! GitHub REST API client
//!
//! Used both as a metadata fetcher (repository + README) and by the GitHub
//! candidate sources (search and single-repository lookups).

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use super::{get_json, get_optional_text, MetadataFetcher};
use crate::config::GitHubConfig;
use crate::models::{Candidate, Category, FullRecord};
use crate::utils::error::FetchError;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
    api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

/// Repository as returned by `/repos/{owner}/{repo}` and search
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub html_url: String,
    pub full_name: String,
    pub name: String,
    pub owner: RepoOwner,
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    String::from("main")
}

impl RepoInfo {
    pub fn into_candidate(self, origin_tag: &str) -> Candidate {
        Candidate::new(self.html_url, self.full_name)
            .with_description(
                self.description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| String::from("No description provided")),
            )
            .with_popularity(self.stargazers_count)
            .with_language(self.language.unwrap_or_else(|| String::from("Unknown")))
            .with_topics(self.topics)
            .with_origin(origin_tag)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RepoInfo>,
}

impl GitHubClient {
    pub fn new(client: Client, config: &GitHubConfig) -> Self {
        Self {
            client,
            token: config.token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, path: &str, accept: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}{path}", self.api_base))
            .header(ACCEPT, accept);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }

    /// Repository search sorted by stars, best first
    pub async fn search(&self, query: &str, per_page: usize) -> Result<Vec<RepoInfo>, FetchError> {
        let per_page = per_page.to_string();
        let request = self.get("/search/repositories", JSON_MEDIA_TYPE).query(&[
            ("q", query),
            ("sort", "stars"),
            ("order", "desc"),
            ("per_page", per_page.as_str()),
        ]);
        let response: SearchResponse = get_json(request, query).await?;
        Ok(response.items)
    }

    pub async fn repo(&self, owner: &str, name: &str) -> Result<RepoInfo, FetchError> {
        let request = self.get(&format!("/repos/{owner}/{name}"), JSON_MEDIA_TYPE);
        get_json(request, &format!("{owner}/{name}")).await
    }

    /// Raw README text; empty when the repository has none
    pub async fn readme(&self, owner: &str, name: &str) -> Result<String, FetchError> {
        let request = self.get(&format!("/repos/{owner}/{name}/readme"), RAW_MEDIA_TYPE);
        Ok(get_optional_text(request, &format!("{owner}/{name} README"))
            .await?
            .unwrap_or_default())
    }
}

/// Split `https://github.com/owner/repo[/...]` into owner and repo
pub fn parse_repo_url(url: &str) -> Result<(String, String), FetchError> {
    let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?
        .filter(|s| !s.is_empty());

    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) => Ok((
            owner.to_string(),
            repo.trim_end_matches(".git").to_string(),
        )),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

#[async_trait]
impl MetadataFetcher for GitHubClient {
    async fn fetch(&self, url: &str, category: Category) -> Result<FullRecord, FetchError> {
        let (owner, name) = parse_repo_url(url)?;
        let repo = self.repo(&owner, &name).await?;

        let body = match self.readme(&owner, &name).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(repo = %repo.full_name, error = %e, "README unavailable");
                String::new()
            }
        };

        tracing::info!(
            repo = %repo.full_name,
            stars = repo.stargazers_count,
            readme_bytes = body.len(),
            "Fetched GitHub metadata"
        );

        Ok(FullRecord {
            url: url.to_string(),
            owner: repo.owner.login,
            name: repo.name,
            full_name: repo.full_name,
            description: repo
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| String::from("No description")),
            popularity: repo.stargazers_count,
            downloads: None,
            language: repo.language.unwrap_or_else(|| String::from("Unknown")),
            topics: repo.topics,
            pipeline_tag: None,
            body,
            default_branch: repo.default_branch,
            category: Some(category),
        })
    }
}
