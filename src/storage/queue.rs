//! Durable FIFO work queue backed by `queue.txt`
//!
//! One entry per line, `url` or `url|category`. Every operation re-reads the
//! file, because discovery and publishing run as separate processes that may
//! interleave. Each mutation rewrites the whole file atomically. Lines that do
//! not parse are kept verbatim in place: they are invisible to readers but
//! never dropped by a rewrite.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::{Category, QueueEntry};
use crate::utils::error::StorageError;
use crate::utils::{normalize_url, write_atomic};

/// One non-blank line of the queue file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueLine {
    Entry(QueueEntry),
    /// Unparseable line, carried through rewrites unchanged
    Invalid(String),
}

impl QueueLine {
    pub fn parse(line: &str) -> Self {
        match line.parse::<QueueEntry>() {
            Ok(entry) => Self::Entry(entry),
            Err(reason) => {
                let err = StorageError::InvalidEntry {
                    line: line.to_string(),
                    reason,
                };
                tracing::warn!(error = %err, "Keeping unreadable queue line as is");
                Self::Invalid(line.to_string())
            }
        }
    }

    pub fn entry(&self) -> Option<&QueueEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Invalid(_) => None,
        }
    }

    fn to_line(&self) -> String {
        match self {
            Self::Entry(entry) => entry.to_line(),
            Self::Invalid(raw) => raw.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every non-blank line in file order, valid or not
    pub fn load_lines(&self) -> Result<Vec<QueueLine>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::read(&self.path, e)),
        };

        Ok(parse_lines(&content))
    }

    fn write_lines(&self, lines: &[QueueLine]) -> Result<(), StorageError> {
        let mut content = lines
            .iter()
            .map(QueueLine::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        write_atomic(&self.path, content.as_bytes()).map_err(|e| StorageError::write(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), lines = lines.len(), "Queue saved");
        Ok(())
    }

    /// Valid entries in file order; a missing file is an empty queue
    pub fn load(&self) -> Result<Vec<QueueEntry>, StorageError> {
        Ok(self
            .load_lines()?
            .into_iter()
            .filter_map(|line| match line {
                QueueLine::Entry(entry) => Some(entry),
                QueueLine::Invalid(_) => None,
            })
            .collect())
    }

    /// Replace the valid entries atomically
    ///
    /// Unreadable lines already in the file are kept after the new entries.
    /// An empty queue is an empty file.
    pub fn save(&self, entries: &[QueueEntry]) -> Result<(), StorageError> {
        let mut lines: Vec<QueueLine> = entries.iter().cloned().map(QueueLine::Entry).collect();
        lines.extend(
            self.load_lines()?
                .into_iter()
                .filter(|line| matches!(line, QueueLine::Invalid(_))),
        );
        self.write_lines(&lines)
    }

    /// Append entries after the existing lines
    pub fn append(&self, entries: &[QueueEntry]) -> Result<usize, StorageError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut lines = self.load_lines()?;
        lines.extend(entries.iter().cloned().map(QueueLine::Entry));
        self.write_lines(&lines)?;
        Ok(entries.len())
    }

    /// First valid entry without removing it
    pub fn peek_front(&self) -> Result<Option<QueueEntry>, StorageError> {
        Ok(self
            .load_lines()?
            .iter()
            .find_map(QueueLine::entry)
            .cloned())
    }

    /// Remove and return the first valid entry
    pub fn pop_front(&self) -> Result<Option<QueueEntry>, StorageError> {
        let mut lines = self.load_lines()?;
        let Some(index) = lines.iter().position(|line| line.entry().is_some()) else {
            return Ok(None);
        };
        let head = match lines.remove(index) {
            QueueLine::Entry(entry) => entry,
            QueueLine::Invalid(_) => return Ok(None),
        };
        self.write_lines(&lines)?;
        Ok(Some(head))
    }

    /// Remove a previously peeked entry
    ///
    /// Pops the head when it still matches; otherwise removes the first entry
    /// with the same normalized URL and category. Returns whether anything
    /// was removed.
    pub fn remove_first(&self, entry: &QueueEntry) -> Result<bool, StorageError> {
        let mut lines = self.load_lines()?;
        let target = entry.normalized_url();

        let head = lines.iter().position(|line| line.entry().is_some());
        let position = lines.iter().position(|line| {
            line.entry()
                .is_some_and(|e| e.category == entry.category && e.normalized_url() == target)
        });

        match position {
            Some(index) => {
                if Some(index) != head {
                    tracing::warn!(
                        url = %entry.url,
                        index,
                        "Queue head changed since it was read, removing first matching entry"
                    );
                }
                lines.remove(index);
                self.write_lines(&lines)?;
                Ok(true)
            }
            None => {
                tracing::warn!(url = %entry.url, "Entry already gone from queue");
                Ok(false)
            }
        }
    }

    /// Live stock per category; every category is present, possibly zero
    pub fn count_by_category(&self) -> Result<BTreeMap<Category, usize>, StorageError> {
        let mut counts: BTreeMap<Category, usize> =
            Category::PRIORITY.iter().map(|c| (*c, 0)).collect();
        for entry in self.load()? {
            *counts.entry(entry.category).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Whether an entry with this normalized URL is queued
    pub fn contains(&self, url: &str) -> Result<bool, StorageError> {
        let target = normalize_url(url);
        Ok(self.load()?.iter().any(|e| e.normalized_url() == target))
    }
}

/// Parse queue file content into lines, skipping blank ones
pub fn parse_lines(content: &str) -> Vec<QueueLine> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(QueueLine::parse)
        .collect()
}

/// Valid entries of queue file content
pub fn parse_queue(content: &str) -> Vec<QueueEntry> {
    parse_lines(content)
        .into_iter()
        .filter_map(|line| match line {
            QueueLine::Entry(entry) => Some(entry),
            QueueLine::Invalid(_) => None,
        })
        .collect()
}
