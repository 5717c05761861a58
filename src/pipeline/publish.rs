//! Process-one publisher
//!
//! Each invocation takes the head of the queue through a fixed sequence of
//! states. The entry leaves the queue only at the end of a successful run, or
//! when it is a duplicate or falls below its popularity minimum. Any other
//! failure before the archive is written leaves queue and history untouched,
//! so the next invocation retries the same entry.

use std::sync::Arc;

use crate::assets::AssetExtractor;
use crate::channels::{Channel, ChannelOutcome};
use crate::config::{Config, PerCategory};
use crate::content::ContentGenerator;
use crate::error::Result;
use crate::metadata::MetadataFetcher;
use crate::models::{ArchiveRecord, Asset, GeneratedContent, PostDraft, QueueEntry};
use crate::notifications::{Notification, Notifier};
use crate::storage::{Archiver, HistoryStore, QueueStore};

/// Publisher progress within one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    Dequeued,
    MetadataFetched,
    ThresholdChecked,
    AssetExtracted,
    ContentGenerated,
    Archived,
    ChannelAttempted(usize),
    Notified,
    Done,
}

/// Everything a successful publish produced
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub entry: QueueEntry,
    pub archive: ArchiveRecord,
    pub asset: Option<Asset>,
    pub channels: Vec<ChannelOutcome>,
    pub used_fallback_content: bool,
    pub notified: bool,
}

impl PublishReport {
    pub fn succeeded_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.succeeded()).count()
    }
}

/// Terminal result of one invocation
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Queue had no entries
    Empty,
    /// Head entry was already in history and has been removed
    SkippedDuplicate { entry: QueueEntry },
    /// Head entry fell below its category minimum and has been removed
    RejectedLowPopularity {
        entry: QueueEntry,
        popularity: u64,
        minimum: u64,
    },
    Published(Box<PublishReport>),
}

impl PublishOutcome {
    /// Process exit code: only a real publish counts as success
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Published(_) => 0,
            Self::Empty | Self::SkippedDuplicate { .. } | Self::RejectedLowPopularity { .. } => 1,
        }
    }
}

struct Progress(PublishState);

impl Progress {
    fn advance(&mut self, next: PublishState) {
        tracing::debug!(from = ?self.0, state = ?next, "Publisher state");
        self.0 = next;
    }
}

pub struct Publisher {
    queue: QueueStore,
    history: HistoryStore,
    fetcher: Arc<dyn MetadataFetcher>,
    assets: Arc<dyn AssetExtractor>,
    generator: Arc<dyn ContentGenerator>,
    archiver: Arc<dyn Archiver>,
    channels: Vec<Arc<dyn Channel>>,
    notifier: Option<Arc<dyn Notifier>>,
    min_popularity: PerCategory<u64>,
    notify_on_reject: bool,
}

impl Publisher {
    pub fn new(
        queue: QueueStore,
        history: HistoryStore,
        fetcher: Arc<dyn MetadataFetcher>,
        assets: Arc<dyn AssetExtractor>,
        generator: Arc<dyn ContentGenerator>,
        archiver: Arc<dyn Archiver>,
        config: &Config,
    ) -> Self {
        Self {
            queue,
            history,
            fetcher,
            assets,
            generator,
            archiver,
            channels: Vec::new(),
            notifier: None,
            min_popularity: config.thresholds.min_popularity,
            notify_on_reject: config.telegram.notify_on_reject,
        }
    }

    pub fn with_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Publish the head of the queue
    pub async fn process_one(&self) -> Result<PublishOutcome> {
        let mut progress = Progress(PublishState::Idle);
        let result = self.drive(&mut progress).await;
        if let Err(e) = &result {
            tracing::error!(state = ?progress.0, error = %e, "Publish aborted, queue left unchanged");
        }
        result
    }

    async fn drive(&self, progress: &mut Progress) -> Result<PublishOutcome> {
        let Some(entry) = self.queue.peek_front()? else {
            tracing::info!("Queue is empty");
            return Ok(PublishOutcome::Empty);
        };
        progress.advance(PublishState::Dequeued);
        tracing::info!(url = %entry.url, category = %entry.category, "Dequeued");

        if self.history.contains(&entry.url)? {
            self.queue.remove_first(&entry)?;
            tracing::warn!(url = %entry.url, "Already published, removed duplicate from queue");
            return Ok(PublishOutcome::SkippedDuplicate { entry });
        }

        let record = self.fetcher.fetch(&entry.url, entry.category).await?;
        progress.advance(PublishState::MetadataFetched);

        let minimum = self.min_popularity.get(entry.category);
        if record.popularity < minimum {
            self.queue.remove_first(&entry)?;
            tracing::info!(
                url = %entry.url,
                popularity = record.popularity,
                minimum,
                unit = entry.category.popularity_label(),
                "Below popularity minimum, removed from queue"
            );
            if self.notify_on_reject {
                let notification = Notification::rejected(
                    entry.category,
                    &record.full_name,
                    &entry.url,
                    record.popularity,
                    minimum,
                );
                self.notify(&notification).await;
            }
            return Ok(PublishOutcome::RejectedLowPopularity {
                entry,
                popularity: record.popularity,
                minimum,
            });
        }
        progress.advance(PublishState::ThresholdChecked);

        let asset = self.assets.extract(&record).await;
        progress.advance(PublishState::AssetExtracted);

        let (content, used_fallback_content) = match self.generator.generate(&record).await {
            Ok(content) => (content, false),
            Err(e) => {
                tracing::warn!(item = %record.full_name, error = %e, "Generation failed, using fallback content");
                (GeneratedContent::fallback(&record), true)
            }
        };
        progress.advance(PublishState::ContentGenerated);

        let archive = self.archiver.write(&record, &content, asset.as_ref()).await?;
        progress.advance(PublishState::Archived);

        let draft = PostDraft {
            item_url: entry.url.clone(),
            archive_url: archive.url.clone(),
            content,
        };

        let mut outcomes = Vec::with_capacity(self.channels.len());
        for (index, channel) in self.channels.iter().enumerate() {
            let outcome = match channel.publish(&draft, asset.as_ref()).await {
                Ok(receipt) => {
                    tracing::info!(channel = channel.name(), url = %receipt.url, "Posted");
                    ChannelOutcome::success(receipt)
                }
                Err(e) => {
                    tracing::warn!(channel = channel.name(), error = %e, "Channel failed, continuing");
                    ChannelOutcome::failure(channel.name(), e.to_string())
                }
            };
            outcomes.push(outcome);
            progress.advance(PublishState::ChannelAttempted(index));
        }

        let notification = Notification::published(
            entry.category,
            &record.full_name,
            &entry.url,
            &draft.content.summary,
            &archive.url,
            outcomes.clone(),
        );
        let notified = self.notify(&notification).await;
        progress.advance(PublishState::Notified);

        self.queue.remove_first(&entry)?;
        self.history.append(&entry.url)?;
        progress.advance(PublishState::Done);

        let report = PublishReport {
            entry,
            archive,
            asset,
            channels: outcomes,
            used_fallback_content,
            notified,
        };
        tracing::info!(
            url = %report.entry.url,
            archive = %report.archive.url,
            channels_ok = report.succeeded_channels(),
            channels_total = report.channels.len(),
            "Published"
        );
        Ok(PublishOutcome::Published(Box::new(report)))
    }

    async fn notify(&self, notification: &Notification) -> bool {
        match &self.notifier {
            Some(notifier) => {
                let delivered = notifier.notify(notification).await;
                if !delivered {
                    tracing::warn!(notifier = notifier.name(), "Notification not delivered");
                }
                delivered
            }
            None => false,
        }
    }
}
