//! Flat-file state and the static archive
//!
//! Cross-run state lives in two newline-delimited text files: the queue
//! (`queue.txt`, rewritten as a whole) and the history (`history.txt`,
//! append-only). Published posts are written to the static site archive.

pub mod dedup;
pub mod history;
pub mod lock;
pub mod markdown;
pub mod queue;

pub use dedup::DedupIndex;
pub use history::HistoryStore;
pub use lock::StateLock;
pub use markdown::{Archiver, JekyllArchiver};
pub use queue::QueueStore;

use std::time::Duration;

use crate::config::Config;
use crate::utils::error::StorageError;

/// The two state files of one deployment
#[derive(Debug, Clone)]
pub struct StateFiles {
    pub queue: QueueStore,
    pub history: HistoryStore,
}

impl StateFiles {
    pub fn from_config(config: &Config) -> Self {
        Self {
            queue: QueueStore::new(&config.paths.queue_file),
            history: HistoryStore::new(&config.paths.history_file),
        }
    }

    /// Take the advisory lock when enabled in config
    pub fn lock(&self, config: &Config) -> Result<Option<StateLock>, StorageError> {
        if !config.state.lock {
            return Ok(None);
        }
        StateLock::acquire(
            config.lock_path(),
            Duration::from_secs(config.state.stale_lock_secs),
        )
        .map(Some)
    }

    pub fn dedup_index(&self) -> Result<DedupIndex, StorageError> {
        DedupIndex::load(&self.history, self.queue.clone())
    }
}
