//! "Already seen" index over history and the live queue
//!
//! History is loaded once per run. The queue is re-read on every query since
//! another invocation may have changed it in the meantime. No lock is held
//! between a query and a later write.

use std::collections::HashSet;

use super::{HistoryStore, QueueStore};
use crate::utils::error::StorageError;
use crate::utils::normalize_url;

#[derive(Debug, Clone)]
pub struct DedupIndex {
    history: HashSet<String>,
    queue: QueueStore,
}

impl DedupIndex {
    pub fn load(history: &HistoryStore, queue: QueueStore) -> Result<Self, StorageError> {
        let history = history.load()?;
        tracing::debug!(history = history.len(), "Dedup index loaded");
        Ok(Self { history, queue })
    }

    /// Whether the URL was already published
    pub fn in_history(&self, url: &str) -> bool {
        self.history.contains(&normalize_url(url))
    }

    /// Whether the URL was published or is currently queued
    pub fn seen(&self, url: &str) -> Result<bool, StorageError> {
        if self.in_history(url) {
            return Ok(true);
        }
        self.queue.contains(url)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, QueueEntry};
    use tempfile::TempDir;

    #[test]
    fn test_seen_checks_history_and_fresh_queue() {
        let dir = TempDir::new().unwrap();
        let history = HistoryStore::new(dir.path().join("history.txt"));
        let queue = QueueStore::new(dir.path().join("queue.txt"));
        history.append("https://x/published").unwrap();

        let index = DedupIndex::load(&history, queue.clone()).unwrap();
        assert!(index.seen("https://x/published/").unwrap());
        assert!(!index.seen("https://x/queued").unwrap());

        queue
            .append(&[QueueEntry::new("https://x/queued/", Category::General)])
            .unwrap();
        assert!(index.seen("https://x/queued").unwrap());
        assert!(!index.in_history("https://x/queued"));
    }
}
