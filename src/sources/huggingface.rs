//! Hugging Face trending models

use async_trait::async_trait;

use super::CandidateSource;
use crate::metadata::HuggingFaceClient;
use crate::models::{Candidate, Category};

pub struct HuggingFaceTrendingSource {
    client: HuggingFaceClient,
    limit: usize,
}

impl HuggingFaceTrendingSource {
    pub fn new(client: HuggingFaceClient, limit: usize) -> Self {
        Self { client, limit }
    }
}

#[async_trait]
impl CandidateSource for HuggingFaceTrendingSource {
    fn name(&self) -> &str {
        "huggingface-trending"
    }

    async fn fetch(&self) -> Vec<Candidate> {
        let models = match self.client.trending(self.limit).await {
            Ok(models) => models,
            Err(e) => {
                tracing::warn!(source = self.name(), error = %e, "Trending models unavailable");
                return Vec::new();
            }
        };

        models
            .into_iter()
            .map(|model| {
                Candidate::new(self.client.model_url(&model.id), model.id.clone())
                    .with_description(model.describe())
                    .with_popularity(model.likes)
                    .with_language(
                        model
                            .library_name
                            .clone()
                            .filter(|l| !l.is_empty())
                            .unwrap_or_else(|| String::from("Unknown")),
                    )
                    .with_topics(model.tags.into_iter().take(5))
                    .with_origin(self.name())
                    .with_category_hint(Category::ModelHub)
            })
            .collect()
    }
}
