//! Category-balanced discovery pass

use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::classifier::{Classifier, FailurePolicy};
use crate::config::{Config, PerCategory};
use crate::error::Result;
use crate::models::{Candidate, Category, QueueEntry};
use crate::sources::SourceRegistry;
use crate::storage::{DedupIndex, QueueStore};

/// What one discovery pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Missing stock per category at the start of the pass
    pub deficits: BTreeMap<Category, usize>,
    /// Entries appended per category
    pub accepted: BTreeMap<Category, usize>,
    /// Candidates that reached the classifier
    pub evaluated: usize,
}

impl DiscoveryReport {
    pub fn total_accepted(&self) -> usize {
        self.accepted.values().sum()
    }
}

/// `max(0, minimum_stock - stock)`
pub fn deficit(minimum_stock: usize, stock: usize) -> usize {
    minimum_stock.saturating_sub(stock)
}

/// Keep the first candidate per normalized URL
pub fn dedup_batch(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.normalized_url()))
        .collect()
}

pub struct Discoverer {
    sources: SourceRegistry,
    classifier: Classifier,
    queue: QueueStore,
    dedup: DedupIndex,
    minimum_stock: usize,
    min_popularity: PerCategory<u64>,
    rng: ChaCha8Rng,
}

impl Discoverer {
    pub fn new(
        sources: SourceRegistry,
        classifier: Classifier,
        queue: QueueStore,
        dedup: DedupIndex,
        config: &Config,
    ) -> Self {
        let seed = config.discovery.shuffle_seed.unwrap_or_else(rand::random);
        Self {
            sources,
            classifier,
            queue,
            dedup,
            minimum_stock: config.discovery.minimum_stock,
            min_popularity: config.thresholds.min_popularity,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Bring every category up to `minimum_stock`, appending once at the end
    pub async fn run(&mut self) -> Result<DiscoveryReport> {
        let stock = self.queue.count_by_category()?;
        let mut report = DiscoveryReport::default();
        let mut accepted_urls = HashSet::new();
        let mut additions = Vec::new();

        for category in Category::PRIORITY {
            let current = stock.get(&category).copied().unwrap_or(0);
            let needed = deficit(self.minimum_stock, current);
            report.deficits.insert(category, needed);
            report.accepted.insert(category, 0);

            if needed == 0 {
                tracing::info!(category = %category, stock = current, "Stock sufficient");
                continue;
            }
            tracing::info!(category = %category, stock = current, deficit = needed, "Discovering");

            let minimum = self.min_popularity.get(category);
            let mut candidates: Vec<Candidate> = dedup_batch(self.sources.collect(category).await)
                .into_iter()
                .filter(|c| c.popularity >= minimum)
                .collect();
            candidates.shuffle(&mut self.rng);

            let entries = self
                .filter_and_add(candidates, category, needed, &mut accepted_urls, &mut report)
                .await?;
            report.accepted.insert(category, entries.len());
            additions.extend(entries);
        }

        if !additions.is_empty() {
            let added = self.queue.append(&additions)?;
            tracing::info!(added, "Queue updated");
        } else {
            tracing::info!("Nothing added to queue");
        }

        Ok(report)
    }

    /// Accept up to `deficit` candidates for `category`
    pub async fn filter_and_add(
        &self,
        candidates: Vec<Candidate>,
        category: Category,
        deficit: usize,
        accepted_urls: &mut HashSet<String>,
        report: &mut DiscoveryReport,
    ) -> Result<Vec<QueueEntry>> {
        let mut entries = Vec::new();

        for candidate in candidates {
            if entries.len() >= deficit {
                break;
            }

            let url = candidate.normalized_url();
            if accepted_urls.contains(&url) || self.dedup.seen(&url)? {
                tracing::debug!(url = %url, "Already known");
                continue;
            }

            if category.needs_language_screen()
                && !self
                    .classifier
                    .is_in_target_language(&candidate)
                    .await
                    .resolve(FailurePolicy::FailOpen)
            {
                tracing::info!(name = %candidate.display_name, "Not in target language");
                continue;
            }

            report.evaluated += 1;
            let verdict = self.classifier.decide(&candidate, category).await;
            if verdict.resolve(FailurePolicy::FailClosed) {
                tracing::info!(
                    name = %candidate.display_name,
                    category = %category,
                    popularity = candidate.popularity,
                    origin = %candidate.origin_tag,
                    "Accepted"
                );
                accepted_urls.insert(url);
                entries.push(QueueEntry::new(candidate.url, category));
            }
        }

        Ok(entries)
    }
}
