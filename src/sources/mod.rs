//! Candidate sources
//!
//! Each source asks one external origin for recent or trending items and maps
//! them into [`Candidate`] values. Sources never fail past this boundary: a
//! transient error is logged and the source contributes nothing this pass.

pub mod github;
pub mod hackernews;
pub mod huggingface;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Candidate, Category};

pub use github::{GitHubTopicSource, GitHubTrendingSource};
pub use hackernews::HackerNewsSource;
pub use huggingface::HuggingFaceTrendingSource;

/// One external origin of candidates
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Tag recorded on every candidate this source yields
    fn name(&self) -> &str;

    /// Current candidates; empty on any failure
    async fn fetch(&self) -> Vec<Candidate>;
}

/// Sources grouped by the category they feed
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: BTreeMap<Category, Vec<Arc<dyn CandidateSource>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, category: Category, source: Arc<dyn CandidateSource>) {
        self.sources.entry(category).or_default().push(source);
    }

    pub fn with(mut self, category: Category, source: Arc<dyn CandidateSource>) -> Self {
        self.register(category, source);
        self
    }

    pub fn for_category(&self, category: Category) -> &[Arc<dyn CandidateSource>] {
        self.sources
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Pull every source of a category in registration order
    pub async fn collect(&self, category: Category) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for source in self.for_category(category) {
            let batch = source.fetch().await;
            tracing::info!(
                source = source.name(),
                category = %category,
                count = batch.len(),
                "Fetched candidates"
            );
            candidates.extend(batch);
        }
        candidates
    }
}
