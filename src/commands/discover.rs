use std::sync::Arc;

use anyhow::{Context, Result};

use repocast::classifier::Classifier;
use repocast::config::Config;
use repocast::metadata::{http_client, GitHubClient, HuggingFaceClient};
use repocast::models::Category;
use repocast::pipeline::{DiscoveryReport, Discoverer};
use repocast::sources::{
    GitHubTopicSource, GitHubTrendingSource, HackerNewsSource, HuggingFaceTrendingSource,
    SourceRegistry,
};
use repocast::storage::StateFiles;

/// Candidate sources for every category
fn sources(config: &Config) -> Result<SourceRegistry> {
    let client = http_client(config).context("Failed to build HTTP client")?;
    let github = GitHubClient::new(client.clone(), &config.github);
    let hub = HuggingFaceClient::new(client.clone(), &config.huggingface);
    let per_page = config.discovery.max_candidates;

    Ok(SourceRegistry::new()
        .with(
            Category::Astronomy,
            Arc::new(GitHubTopicSource::new(
                github.clone(),
                config.github.astronomy_topics.clone(),
                per_page,
                Category::Astronomy,
            )),
        )
        .with(
            Category::ModelHub,
            Arc::new(HuggingFaceTrendingSource::new(hub, per_page)),
        )
        .with(
            Category::General,
            Arc::new(GitHubTrendingSource::new(
                github.clone(),
                config.discovery.trending_window_days,
                config.thresholds.min_popularity.general,
                per_page,
            )),
        )
        .with(
            Category::General,
            Arc::new(HackerNewsSource::new(client, github, &config.hackernews)),
        ))
}

pub async fn discover(config: &Config) -> Result<DiscoveryReport> {
    let files = StateFiles::from_config(config);
    let _lock = files.lock(config)?;

    let classifier = Classifier::new(super::llm_client(config)?, config);
    let dedup = files.dedup_index()?;
    tracing::info!(published = dedup.history_len(), "Loaded history");
    let mut discoverer = Discoverer::new(
        sources(config)?,
        classifier,
        files.queue.clone(),
        dedup,
        config,
    );

    let report = discoverer.run().await?;

    println!("Discovery complete");
    println!("==================");
    for category in Category::PRIORITY {
        println!(
            "  {:<10} deficit {:>2}  added {:>2}",
            category.as_str(),
            report.deficits.get(&category).copied().unwrap_or(0),
            report.accepted.get(&category).copied().unwrap_or(0),
        );
    }
    println!("  Candidates evaluated: {}", report.evaluated);

    Ok(report)
}
