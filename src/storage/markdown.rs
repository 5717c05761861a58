//! Static-site archive with Handlebars templates
//!
//! Every published item becomes a Jekyll post under `_posts/`. The post is
//! written before any social channel is attempted, because channels link to
//! its URL.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::models::{ArchiveRecord, Asset, Category, FullRecord, GeneratedContent};
use crate::utils::write_atomic;

/// Default post template
const DEFAULT_TEMPLATE: &str = include_str!("../../templates/post.hbs");

/// Durable archive of published items
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Write the archive record; must succeed before history is touched
    async fn write(
        &self,
        record: &FullRecord,
        content: &GeneratedContent,
        asset: Option<&Asset>,
    ) -> crate::error::Result<ArchiveRecord>;
}

#[derive(Debug, Serialize)]
struct PostTemplateData {
    layout: String,
    title: String,
    image: Option<String>,
    url: String,
    tags: String,
    date: String,
    body: String,
    is_model: bool,
    popularity: u64,
    downloads: String,
    language: String,
    full_name: String,
}

/// Jekyll post writer
pub struct JekyllArchiver<'a> {
    handlebars: Handlebars<'a>,
    posts_dir: PathBuf,
    base_url: String,
    offset: FixedOffset,
    layout: String,
}

impl<'a> JekyllArchiver<'a> {
    pub fn new(posts_dir: &Path, base_url: &str, offset: FixedOffset) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(false);

        handlebars
            .register_template_string("post", DEFAULT_TEMPLATE)
            .context("Failed to register default post template")?;

        Ok(Self {
            handlebars,
            posts_dir: posts_dir.to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
            offset,
            layout: String::from("post"),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut archiver = Self::new(
            &config.paths.posts_dir,
            &config.site.base_url,
            config.site.offset()?,
        )?;
        archiver.layout = config.site.layout.clone();
        match &config.site.template {
            Some(path) => archiver.with_template(path),
            None => Ok(archiver),
        }
    }

    /// Replace the built-in template with a file
    pub fn with_template(mut self, template_path: &Path) -> Result<Self> {
        self.handlebars
            .register_template_file("post", template_path)
            .context("Failed to register custom post template")?;
        Ok(self)
    }

    /// Render the post body for a given timestamp
    pub fn render(
        &self,
        record: &FullRecord,
        content: &GeneratedContent,
        asset: Option<&Asset>,
        now: DateTime<FixedOffset>,
    ) -> Result<String> {
        let mut tags: Vec<&str> = content.hashtags.iter().map(|t| t.trim_start_matches('#')).collect();
        if record.has_known_language() {
            tags.push(&record.language);
        }

        let data = PostTemplateData {
            layout: self.layout.clone(),
            title: yaml_escape(&content.summary),
            image: asset
                .and_then(|a| a.original_path.file_name())
                .map(|name| format!("/assets/images/{}", name.to_string_lossy())),
            url: record.url.clone(),
            tags: tags
                .iter()
                .map(|t| format!("\"{}\"", yaml_escape(t)))
                .collect::<Vec<_>>()
                .join(", "),
            date: now.format("%Y-%m-%d %H:%M:%S %z").to_string(),
            body: content.body.clone(),
            is_model: record.category() == Category::ModelHub,
            popularity: record.popularity,
            downloads: format_thousands(record.downloads.unwrap_or(0)),
            language: record.language.clone(),
            full_name: record.full_name.clone(),
        };

        self.handlebars
            .render("post", &data)
            .context("Failed to render post template")
    }

    /// Write the post as of `now`
    pub fn write_at(
        &self,
        record: &FullRecord,
        content: &GeneratedContent,
        asset: Option<&Asset>,
        now: DateTime<FixedOffset>,
    ) -> Result<ArchiveRecord> {
        let date = now.format("%Y-%m-%d").to_string();
        let slug = self.free_slug(record, &date);
        let markdown = self.render(record, content, asset, now)?;
        let path = self.posts_dir.join(format!("{date}-{slug}.md"));

        write_atomic(&path, markdown.as_bytes())
            .with_context(|| format!("Failed to write post: {}", path.display()))?;

        let url = format!("{}/{}/{slug}/", self.base_url, now.format("%Y/%m/%d"));
        let content_hash = format!("{:x}", Sha256::digest(markdown.as_bytes()));

        tracing::info!(path = %path.display(), url = %url, "Archive post written");
        Ok(ArchiveRecord {
            path,
            url,
            content_hash,
        })
    }

    /// Slug whose post file for `date` does not exist yet
    ///
    /// Existing posts are never overwritten: a name already taken that day is
    /// qualified with the owner, then numbered.
    fn free_slug(&self, record: &FullRecord, date: &str) -> String {
        let taken = |slug: &str| self.posts_dir.join(format!("{date}-{slug}.md")).exists();

        let slug = record.slug();
        if !taken(&slug) {
            return slug;
        }
        let qualified = record.qualified_slug();
        if !taken(&qualified) {
            return qualified;
        }
        (2..)
            .map(|n| format!("{qualified}-{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or(qualified)
    }
}

#[async_trait]
impl Archiver for JekyllArchiver<'_> {
    async fn write(
        &self,
        record: &FullRecord,
        content: &GeneratedContent,
        asset: Option<&Asset>,
    ) -> crate::error::Result<ArchiveRecord> {
        let now = Utc::now().with_timezone(&self.offset);
        Ok(self.write_at(record, content, asset, now)?)
    }
}

fn yaml_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
