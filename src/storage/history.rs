//! Append-only record of published URLs (`history.txt`)

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::utils::error::StorageError;
use crate::utils::normalize_url;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded URLs, normalized; missing file is empty history
    pub fn load(&self) -> Result<HashSet<String>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(StorageError::read(&self.path, e)),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(normalize_url)
            .collect())
    }

    pub fn contains(&self, url: &str) -> Result<bool, StorageError> {
        Ok(self.load()?.contains(&normalize_url(url)))
    }

    /// Record a published URL
    ///
    /// Writes the normalized form on its own line. Returns `false` without
    /// writing when the URL is already recorded.
    pub fn append(&self, url: &str) -> Result<bool, StorageError> {
        let normalized = normalize_url(url);
        if self.load()?.contains(&normalized) {
            tracing::warn!(url = %normalized, "URL already in history, not appending");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::write(&self.path, e))?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| StorageError::write(&self.path, e))?;

        let needs_newline = ends_without_newline(&mut file).map_err(|e| StorageError::write(&self.path, e))?;
        let line = if needs_newline {
            format!("\n{normalized}\n")
        } else {
            format!("{normalized}\n")
        };

        file.write_all(line.as_bytes())
            .map_err(|e| StorageError::write(&self.path, e))?;

        tracing::debug!(url = %normalized, "Appended to history");
        Ok(true)
    }
}

fn ends_without_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
