// Core data structures for repocast

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::{normalize_url, slugify, truncate_text};

/// Content category with its own quota, thresholds and prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    General,
    Astronomy,
    ModelHub,
}

impl Category {
    /// Discovery priority: niche science first, then model hub, then general
    pub const PRIORITY: [Category; 3] = [Self::Astronomy, Self::ModelHub, Self::General];

    /// Wire name used in `queue.txt`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Astronomy => "astronomy",
            Self::ModelHub => "model-hub",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "GitHub",
            Self::Astronomy => "Astronomy",
            Self::ModelHub => "Model Hub",
        }
    }

    /// Emoji used in notifications
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::General => "💻",
            Self::Astronomy => "🔭",
            Self::ModelHub => "🤗",
        }
    }

    /// Popularity unit shown in logs and archive footers
    pub fn popularity_label(&self) -> &'static str {
        match self {
            Self::ModelHub => "likes",
            _ => "stars",
        }
    }

    /// Whether items are natural-language repository listings
    ///
    /// Model-hub entries are not, so the language screen is skipped for them.
    pub fn needs_language_screen(&self) -> bool {
        !matches!(self, Self::ModelHub)
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Some(Self::General),
            "astronomy" => Some(Self::Astronomy),
            "model-hub" | "modelhub" | "huggingface" => Some(Self::ModelHub),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated item discovered from an external source
///
/// Lives for one discovery pass and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub display_name: String,
    pub description: String,
    pub popularity: u64,
    pub primary_language: String,
    pub topics: BTreeSet<String>,
    pub origin_tag: String,
    pub category_hint: Option<Category>,
}

impl Candidate {
    pub fn new(url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: display_name.into(),
            description: String::from("No description provided"),
            popularity: 0,
            primary_language: String::from("Unknown"),
            topics: BTreeSet::new(),
            origin_tag: String::new(),
            category_hint: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_popularity(mut self, popularity: u64) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.primary_language = language.into();
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_origin(mut self, origin_tag: impl Into<String>) -> Self {
        self.origin_tag = origin_tag.into();
        self
    }

    pub fn with_category_hint(mut self, category: Category) -> Self {
        self.category_hint = Some(category);
        self
    }

    /// URL with one trailing slash stripped
    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Comma-separated topic list, or "None"
    pub fn topics_line(&self) -> String {
        if self.topics.is_empty() {
            String::from("None")
        } else {
            self.topics.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

/// Persisted unit of work: one line of `queue.txt`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueEntry {
    pub url: String,
    pub category: Category,
}

impl QueueEntry {
    pub fn new(url: impl Into<String>, category: Category) -> Self {
        Self {
            url: url.into(),
            category,
        }
    }

    /// URL with one trailing slash stripped
    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Serialize to the `url|category` wire form
    ///
    /// General entries are written with an explicit suffix too; readers treat a
    /// missing suffix as general, so both forms round-trip.
    pub fn to_line(&self) -> String {
        format!("{}|{}", self.url, self.category)
    }
}

impl FromStr for QueueEntry {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(String::from("empty line"));
        }

        match line.split_once('|') {
            Some((url, category)) => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(String::from("missing url"));
                }
                let category = Category::parse(category)
                    .ok_or_else(|| format!("unknown category '{}'", category.trim()))?;
                Ok(Self::new(url, category))
            }
            None => Ok(Self::new(line, Category::General)),
        }
    }
}

impl std::fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Full descriptive record returned by a metadata fetcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FullRecord {
    pub url: String,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub popularity: u64,
    pub downloads: Option<u64>,
    pub language: String,
    pub topics: Vec<String>,
    pub pipeline_tag: Option<String>,
    /// Long-form body (README or model card), empty when unavailable
    pub body: String,
    pub default_branch: String,
    pub category: Option<Category>,
}

impl FullRecord {
    pub fn category(&self) -> Category {
        self.category.unwrap_or(Category::General)
    }

    /// Comma-separated topic list, or "None"
    pub fn topics_line(&self) -> String {
        if self.topics.is_empty() {
            String::from("None")
        } else {
            self.topics.join(", ")
        }
    }

    /// Slug of the item name, falling back to the full name
    pub fn slug(&self) -> String {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            slugify(&self.full_name)
        } else {
            slug
        }
    }

    /// Slug of `owner-name`, for telling apart items with the same name
    pub fn qualified_slug(&self) -> String {
        slugify(&format!("{}-{}", self.owner, self.name))
    }

    /// Whether the language is a real value worth tagging
    pub fn has_known_language(&self) -> bool {
        !self.language.is_empty() && self.language != "Unknown"
    }
}

/// Text produced for one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub summary: String,
    pub hashtags: Vec<String>,
    pub body: String,
    #[serde(default)]
    pub first_paragraph: String,
    #[serde(skip)]
    pub category: Option<Category>,
}

impl GeneratedContent {
    /// Deterministic content built only from already-known metadata
    pub fn fallback(record: &FullRecord) -> Self {
        let category = record.category();
        let hashtags = match category {
            Category::Astronomy => ["Astronomy", "OpenSource", "Science"],
            Category::ModelHub => ["AI", "MachineLearning", "OpenSource"],
            Category::General => ["OpenSource", "Developer", "Tools"],
        };

        Self {
            summary: format!(
                "{} - {}",
                record.full_name,
                truncate_chars(&record.description, 100)
            ),
            hashtags: hashtags.iter().map(|s| s.to_string()).collect(),
            body: format!(
                "{}\n\nBuilt with {}.",
                record.description, record.language
            ),
            first_paragraph: record.description.clone(),
            category: Some(category),
        }
    }

    /// Fill in derived fields after parsing an oracle response
    pub fn finalize(mut self, category: Category) -> Self {
        self.category = Some(category);
        self.first_paragraph = self
            .body
            .split("\n\n")
            .map(str::trim)
            .find(|p| !p.is_empty())
            .unwrap_or_default()
            .to_string();
        self
    }

    /// Hashtags rendered as `#A #B #C`
    pub fn hashtag_line(&self) -> String {
        self.hashtags
            .iter()
            .map(|tag| format!("#{}", tag.trim_start_matches('#')))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Representative image extracted from an item's long-form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub source_url: String,
    /// Original file, referenced by the archive
    pub original_path: PathBuf,
    /// Copy small enough for social channels, if any
    pub social_path: Option<PathBuf>,
}

/// Text and links handed to every publishing channel
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub item_url: String,
    pub archive_url: String,
    pub content: GeneratedContent,
}

impl PostDraft {
    /// Long form used by channels without a strict length limit
    pub fn long_text(&self) -> String {
        let mut text = self.content.summary.clone();
        if !self.content.first_paragraph.is_empty() {
            text.push_str("\n\n");
            text.push_str(&self.content.first_paragraph);
        }
        text.push_str(&format!("\n\n🔗 {}\n\n{}", self.item_url, self.content.hashtag_line()));
        text
    }

    /// Alt text for attached images
    pub fn alt_text(&self) -> String {
        truncate_text(&self.content.summary, 100)
    }
}

/// Durable record written to the archive store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub path: PathBuf,
    pub url: String,
    pub content_hash: String,
}

/// External post identifier returned by a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReceipt {
    pub channel: String,
    pub url: String,
}
