//! Hugging Face Hub API client
//!
//! Model info comes from `/api/models/{id}`, the model card from the raw
//! `README.md` on the main revision. Likes stand in for popularity.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use super::{get_json, get_optional_text, MetadataFetcher};
use crate::config::HuggingFaceConfig;
use crate::models::{Category, FullRecord};
use crate::utils::error::FetchError;

/// Tags kept on a model record
const MAX_TOPICS: usize = 5;

#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: Client,
    token: Option<String>,
    api_base: String,
}

/// Model entry from the Hub API
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    #[serde(alias = "modelId")]
    pub id: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub downloads: u64,
    pub pipeline_tag: Option<String>,
    pub library_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ModelInfo {
    /// One-line description built from the pipeline tag and library
    pub fn describe(&self) -> String {
        let pipeline = self.pipeline_tag.as_deref().unwrap_or("unknown");
        let mut description = title_case(&pipeline.replace('-', " "));
        if let Some(library) = self.library_name.as_deref().filter(|l| !l.is_empty()) {
            description.push_str(&format!(" ({library})"));
        }
        description
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl HuggingFaceClient {
    pub fn new(client: Client, config: &HuggingFaceConfig) -> Self {
        Self {
            client,
            token: config.token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(format!("{}{path}", self.api_base));
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    /// Trending models, most trending first
    pub async fn trending(&self, limit: usize) -> Result<Vec<ModelInfo>, FetchError> {
        let limit = limit.to_string();
        let request = self.get("/api/models").query(&[
            ("sort", "trendingScore"),
            ("direction", "-1"),
            ("limit", limit.as_str()),
        ]);
        get_json(request, "trending models").await
    }

    pub async fn model(&self, id: &str) -> Result<ModelInfo, FetchError> {
        get_json(self.get(&format!("/api/models/{id}")), id).await
    }

    /// Model card text; empty when missing
    pub async fn model_card(&self, id: &str) -> Result<String, FetchError> {
        let request = self.get(&format!("/{id}/raw/main/README.md"));
        Ok(get_optional_text(request, &format!("{id} model card"))
            .await?
            .unwrap_or_default())
    }

    /// Public page URL of a model
    pub fn model_url(&self, id: &str) -> String {
        format!("{}/{id}", self.api_base)
    }
}

/// Model id (`org/name`) from a model page URL
pub fn parse_model_id(url: &str) -> Result<String, FetchError> {
    let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    let id = parsed.path().trim_matches('/');
    if id.is_empty() {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    Ok(id.to_string())
}

#[async_trait]
impl MetadataFetcher for HuggingFaceClient {
    async fn fetch(&self, url: &str, category: Category) -> Result<FullRecord, FetchError> {
        let id = parse_model_id(url)?;
        let info = self.model(&id).await?;

        let body = match self.model_card(&id).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(model = %id, error = %e, "Model card unavailable");
                String::new()
            }
        };

        let (owner, name) = match id.split_once('/') {
            Some((owner, name)) => (owner.to_string(), name.to_string()),
            None => (String::from("unknown"), id.clone()),
        };

        tracing::info!(model = %id, likes = info.likes, downloads = info.downloads, "Fetched model metadata");

        Ok(FullRecord {
            url: url.to_string(),
            owner,
            name,
            full_name: id,
            description: info.describe(),
            popularity: info.likes,
            downloads: Some(info.downloads),
            language: info
                .library_name
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| String::from("Unknown")),
            topics: info.tags.iter().take(MAX_TOPICS).cloned().collect(),
            pipeline_tag: info.pipeline_tag,
            body,
            default_branch: String::from("main"),
            category: Some(category),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_model() {
        let info = ModelInfo {
            id: "org/model".into(),
            likes: 10,
            downloads: 20,
            pipeline_tag: Some("text-to-image".into()),
            library_name: Some("diffusers".into()),
            tags: vec![],
        };
        assert_eq!(info.describe(), "Text To Image (diffusers)");

        let bare = ModelInfo {
            pipeline_tag: None,
            library_name: None,
            ..info
        };
        assert_eq!(bare.describe(), "Unknown");
    }

    #[test]
    fn test_parse_model_id() {
        assert_eq!(
            parse_model_id("https://huggingface.co/org/model/").unwrap(),
            "org/model"
        );
        assert!(parse_model_id("https://huggingface.co/").is_err());
    }

    #[test]
    fn test_model_info_accepts_model_id_alias() {
        let info: ModelInfo = serde_json::from_value(serde_json::json!({
            "modelId": "org/m",
            "likes": 3
        }))
        .unwrap();
        assert_eq!(info.id, "org/m");
        assert_eq!(info.downloads, 0);
    }
}
