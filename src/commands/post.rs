use std::sync::Arc;

use anyhow::{Context, Result};

use repocast::assets::{cleanup_images, HeroImageExtractor};
use repocast::channels::bluesky::BlueskyChannel;
use repocast::channels::twitter::TwitterChannel;
use repocast::config::Config;
use repocast::content::LlmContentGenerator;
use repocast::metadata::{http_client, CategoryRouter, GitHubClient, HuggingFaceClient};
use repocast::notifications::TelegramNotifier;
use repocast::pipeline::{PublishOutcome, Publisher};
use repocast::storage::{JekyllArchiver, StateFiles};

fn publisher(config: &Config, files: &StateFiles) -> Result<Publisher> {
    let client = http_client(config).context("Failed to build HTTP client")?;
    let timeout = config.request_timeout();
    let llm = super::llm_client(config)?;

    let fetcher = CategoryRouter::new(
        Arc::new(GitHubClient::new(client.clone(), &config.github)),
        Arc::new(HuggingFaceClient::new(client.clone(), &config.huggingface)),
    );

    let mut publisher = Publisher::new(
        files.queue.clone(),
        files.history.clone(),
        Arc::new(fetcher),
        Arc::new(HeroImageExtractor::new(client, config)),
        Arc::new(LlmContentGenerator::new(llm, config)),
        Arc::new(JekyllArchiver::from_config(config)?),
        config,
    );

    match TwitterChannel::from_config(&config.twitter, timeout)? {
        Some(channel) => publisher = publisher.with_channel(Arc::new(channel)),
        None => tracing::info!("Twitter channel disabled or not configured"),
    }
    match BlueskyChannel::from_config(&config.bluesky, timeout)? {
        Some(channel) => publisher = publisher.with_channel(Arc::new(channel)),
        None => tracing::info!("Bluesky channel disabled or not configured"),
    }
    match TelegramNotifier::from_config(&config.telegram, timeout)? {
        Some(notifier) => publisher = publisher.with_notifier(Arc::new(notifier)),
        None => tracing::info!("Telegram notifier disabled or not configured"),
    }

    Ok(publisher)
}

pub async fn post_one(config: &Config) -> Result<PublishOutcome> {
    let files = StateFiles::from_config(config);
    let _lock = files.lock(config)?;

    cleanup_images(config);

    let outcome = publisher(config, &files)?.process_one().await?;

    match &outcome {
        PublishOutcome::Empty => println!("Queue is empty, nothing to post"),
        PublishOutcome::SkippedDuplicate { entry } => {
            println!("Skipped already published item: {}", entry.url)
        }
        PublishOutcome::RejectedLowPopularity {
            entry,
            popularity,
            minimum,
        } => println!(
            "Dropped {} ({popularity} {}, minimum {minimum})",
            entry.url,
            entry.category.popularity_label()
        ),
        PublishOutcome::Published(report) => {
            println!("Published {}", report.entry.url);
            println!("  Archive: {}", report.archive.url);
            for channel in &report.channels {
                println!("  {channel}");
            }
        }
    }

    Ok(outcome)
}
