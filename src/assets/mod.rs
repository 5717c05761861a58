//! Hero image extraction
//!
//! Scans a README or model card for images in document order, downloads the
//! first usable raster image, and stores it next to the archive posts. The
//! stored file doubles as the social attachment when it is small enough.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::config::Config;
use crate::models::{Asset, Category, FullRecord};
use crate::utils::error::{FetchError, StorageError};
use crate::utils::{format_bytes, write_atomic};

/// URL fragments of status badges, never a hero image
const BADGE_MARKERS: &[&str] = &["badge", "shields.io", "travis", "codecov"];

/// Extensions considered by cleanup
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Finds a representative image for a record
#[async_trait]
pub trait AssetExtractor: Send + Sync {
    /// `None` when no usable image exists; never an error
    async fn extract(&self, record: &FullRecord) -> Option<Asset>;
}

fn markdown_image() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).expect("valid regex"))
}

fn html_image() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)<img[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).expect("valid regex"))
}

/// Image URLs in document order, badges removed
pub fn find_image_urls(body: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = markdown_image()
        .captures_iter(body)
        .chain(html_image().captures_iter(body))
        .filter_map(|c| c.get(1).map(|m| (m.start(), m.as_str().to_string())))
        .collect();
    found.sort_by_key(|(position, _)| *position);

    found
        .into_iter()
        .map(|(_, url)| url)
        .filter(|url| {
            let lower = url.to_lowercase();
            !BADGE_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .collect()
}

/// Absolute download URL for an image reference found in `record.body`
pub fn resolve_image_url(
    reference: &str,
    record: &FullRecord,
    raw_base: &str,
    hub_base: &str,
) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") || reference.starts_with('#') {
        return None;
    }

    if let Some(rest) = reference.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        if reference.contains("://github.com/") && reference.contains("/blob/") {
            return Some(
                reference
                    .replacen("://github.com/", "://raw.githubusercontent.com/", 1)
                    .replacen("/blob/", "/", 1),
            );
        }
        return Some(reference.to_string());
    }

    let path = reference.trim_start_matches("./").trim_start_matches('/');
    let url = match record.category() {
        Category::ModelHub => format!(
            "{}/{}/resolve/main/{path}",
            hub_base.trim_end_matches('/'),
            record.full_name
        ),
        Category::General | Category::Astronomy => format!(
            "{}/{}/{}/{}/{path}",
            raw_base.trim_end_matches('/'),
            record.owner,
            record.name,
            branch_or_default(&record.default_branch)
        ),
    };
    Some(url)
}

fn branch_or_default(branch: &str) -> &str {
    if branch.is_empty() {
        "main"
    } else {
        branch
    }
}

/// File extension for a downloaded image, `None` for SVG or non-images
pub fn image_extension(content_type: &str, url: &str, bytes: &[u8]) -> Option<&'static str> {
    let content_type = content_type.to_lowercase();
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();

    if content_type.contains("svg") || path.ends_with(".svg") || looks_like_svg(bytes) {
        return None;
    }
    if !content_type.starts_with("image/") {
        return None;
    }

    let from_type = match content_type.split(';').next().unwrap_or_default().trim() {
        "image/png" => Some(".png"),
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        _ => None,
    };
    from_type.or_else(|| {
        [".png", ".jpg", ".jpeg", ".gif", ".webp"]
            .into_iter()
            .find(|ext| path.ends_with(ext))
    })
    .or(Some(".png"))
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).to_lowercase();
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// Downloads README images into the archive's image directory
pub struct HeroImageExtractor {
    client: Client,
    images_dir: PathBuf,
    raw_base: String,
    hub_base: String,
    max_attempts: usize,
    social_max_bytes: u64,
}

impl HeroImageExtractor {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            images_dir: config.paths.images_dir.clone(),
            raw_base: config.github.raw_base.clone(),
            hub_base: config.huggingface.api_base.clone(),
            max_attempts: config.images.max_attempts,
            social_max_bytes: config.images.social_max_bytes,
        }
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, String), FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status, url));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }

    fn store(&self, record: &FullRecord, source_url: &str, bytes: &[u8], ext: &str) -> Result<Asset, StorageError> {
        let path = self.images_dir.join(format!("{}-hero{ext}", record.slug()));
        write_atomic(&path, bytes).map_err(|e| StorageError::write(&path, e))?;

        let social_path = (bytes.len() as u64 <= self.social_max_bytes).then(|| path.clone());
        if social_path.is_none() {
            tracing::info!(
                path = %path.display(),
                size = %format_bytes(bytes.len() as u64),
                limit = %format_bytes(self.social_max_bytes),
                "Image too large for social channels"
            );
        }

        Ok(Asset {
            source_url: source_url.to_string(),
            original_path: path,
            social_path,
        })
    }
}

#[async_trait]
impl AssetExtractor for HeroImageExtractor {
    async fn extract(&self, record: &FullRecord) -> Option<Asset> {
        let candidates: Vec<String> = find_image_urls(&record.body)
            .iter()
            .filter_map(|r| resolve_image_url(r, record, &self.raw_base, &self.hub_base))
            .take(self.max_attempts)
            .collect();

        for url in candidates {
            let (bytes, content_type) = match self.download(&url).await {
                Ok(downloaded) => downloaded,
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Image download failed");
                    continue;
                }
            };

            let Some(ext) = image_extension(&content_type, &url, &bytes) else {
                tracing::debug!(url = %url, content_type = %content_type, "Skipping non-raster image");
                continue;
            };

            match self.store(record, &url, &bytes, ext) {
                Ok(asset) => {
                    tracing::info!(url = %url, path = %asset.original_path.display(), "Hero image saved");
                    return Some(asset);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to save image");
                    return None;
                }
            }
        }

        tracing::info!(item = %record.full_name, "No usable image found");
        None
    }
}

/// Delete images that are both larger than `max_bytes` and older than `max_age`
pub fn cleanup_old_large_images(dir: &Path, max_bytes: u64, max_age: Duration) -> Result<usize, StorageError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(StorageError::read(dir, e)),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() || metadata.len() <= max_bytes {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                tracing::info!(path = %path.display(), size = %format_bytes(metadata.len()), "Removed old image");
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove image"),
        }
    }

    Ok(removed)
}

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Pre-publish image cleanup with the configured limits
///
/// Housekeeping only: a failure is logged and reported as nothing removed.
pub fn cleanup_images(config: &Config) -> usize {
    let max_age = Duration::from_secs(config.images.cleanup_max_age_days.saturating_mul(SECONDS_PER_DAY));
    match cleanup_old_large_images(&config.paths.images_dir, config.images.cleanup_max_bytes, max_age) {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(removed, "Cleaned up old images");
            }
            removed
        }
        Err(e) => {
            tracing::warn!(dir = %config.paths.images_dir.display(), error = %e, "Image cleanup failed, continuing");
            0
        }
    }
}
