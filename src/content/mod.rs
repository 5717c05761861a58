//! Post text generation
//!
//! One oracle call per published item. The answer must be a JSON object with
//! `summary`, `hashtags` and `body`; anything else is an error and the caller
//! falls back to [`GeneratedContent::fallback`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{extract_json, CompletionRequest, LlmClient, LlmError};
use crate::models::{Category, FullRecord, GeneratedContent};
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::truncate_text;

/// Hashtags per post
pub const HASHTAG_COUNT: usize = 3;

/// Produces the text of a post from a full record
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, record: &FullRecord) -> Result<GeneratedContent>;
}

#[derive(Debug, Deserialize)]
struct RawContent {
    summary: String,
    hashtags: Vec<String>,
    body: String,
}

/// Parse an oracle answer into content for `category`
pub fn parse_generated(answer: &str, category: Category) -> Result<GeneratedContent> {
    let raw: RawContent = serde_json::from_str(&extract_json(answer))?;

    let summary = raw.summary.trim().to_string();
    let body = raw.body.trim().to_string();
    if summary.is_empty() || body.is_empty() {
        return Err(Error::other("Generated content has an empty summary or body"));
    }

    let hashtags: Vec<String> = raw
        .hashtags
        .iter()
        .map(|tag| tag.trim().trim_start_matches('#').replace(' ', ""))
        .filter(|tag| !tag.is_empty())
        .take(HASHTAG_COUNT)
        .collect();
    if hashtags.len() < HASHTAG_COUNT {
        return Err(Error::other(format!(
            "Expected {HASHTAG_COUNT} hashtags, got {}",
            hashtags.len()
        )));
    }

    Ok(GeneratedContent {
        summary,
        hashtags,
        body,
        first_paragraph: String::new(),
        category: None,
    }
    .finalize(category))
}

/// LLM-backed generator with category-specific prompts
pub struct LlmContentGenerator {
    llm: Arc<dyn LlmClient>,
    retry: RetryConfig,
    readme_preview_chars: usize,
    max_tokens: u32,
    target_language: String,
}

impl LlmContentGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Config) -> Self {
        Self {
            llm,
            retry: RetryConfig::with_delays(
                config.llm.max_retries,
                config.llm.retry_base_delay_ms,
                config.llm.retry_base_delay_ms.saturating_mul(8),
            ),
            readme_preview_chars: config.llm.readme_preview_chars,
            max_tokens: config.llm.generate_max_tokens,
            target_language: config.llm.target_language.clone(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn prompt(&self, record: &FullRecord) -> String {
        let preview = truncate_text(&record.body, self.readme_preview_chars);
        let (subject, audience, details) = match record.category() {
            Category::Astronomy => (
                "astronomy software project",
                "astronomers, astrophysicists and amateur observers",
                format!(
                    "Stars: {}\nLanguage: {}\nTopics: {}",
                    record.popularity,
                    record.language,
                    record.topics_line()
                ),
            ),
            Category::ModelHub => (
                "machine learning model",
                "machine learning practitioners",
                format!(
                    "Task: {}\nLibrary: {}\nLikes: {}\nDownloads: {}\nTags: {}",
                    record.pipeline_tag.as_deref().unwrap_or("unknown"),
                    record.language,
                    record.popularity,
                    record.downloads.unwrap_or(0),
                    record.topics_line()
                ),
            ),
            Category::General => (
                "open source project",
                "developers",
                format!(
                    "Stars: {}\nLanguage: {}\nTopics: {}",
                    record.popularity,
                    record.language,
                    record.topics_line()
                ),
            ),
        };

        format!(
            "Write a short social media post in {language} introducing this {subject} to {audience}.\n\n\
             Name: {name}\nURL: {url}\nDescription: {description}\n{details}\n\n\
             README:\n{preview}\n\n\
             Respond with a JSON object only, in this exact shape:\n\
             {{\"summary\": \"one catchy sentence under 200 characters\", \
             \"hashtags\": [\"Tag1\", \"Tag2\", \"Tag3\"], \
             \"body\": \"two or three short paragraphs separated by blank lines\"}}\n\
             Use exactly {count} hashtags without the # sign.",
            language = self.target_language,
            name = record.full_name,
            url = record.url,
            description = record.description,
            count = HASHTAG_COUNT,
        )
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(&self, record: &FullRecord) -> Result<GeneratedContent> {
        let request = CompletionRequest::new(self.prompt(record))
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.7);

        let response = with_retry_if(
            &self.retry,
            || self.llm.complete(request.clone()),
            |e: &LlmError| e.is_recoverable(),
        )
        .await?;

        let content = parse_generated(&response.text, record.category())?;
        tracing::info!(
            item = %record.full_name,
            summary_chars = content.summary.chars().count(),
            output_tokens = response.usage.output_tokens,
            "Generated post content"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_answer() {
        let answer = "Here you go:\n```json\n{\"summary\": \"A fast tool\", \
                      \"hashtags\": [\"#Rust\", \"Dev Tools\", \"CLI\", \"Extra\"], \
                      \"body\": \"First.\\n\\nSecond.\"}\n```";
        let content = parse_generated(answer, Category::General).unwrap();

        assert_eq!(content.summary, "A fast tool");
        assert_eq!(content.hashtags, vec!["Rust", "DevTools", "CLI"]);
        assert_eq!(content.first_paragraph, "First.");
        assert_eq!(content.category, Some(Category::General));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(parse_generated("{\"summary\": \"x\", \"body\": \"y\"}", Category::General).is_err());
        assert!(parse_generated("not json at all", Category::General).is_err());
    }

    #[test]
    fn test_parse_rejects_too_few_hashtags() {
        let answer = "{\"summary\": \"x\", \"hashtags\": [\"A\", \"#\"], \"body\": \"y\"}";
        assert!(parse_generated(answer, Category::Astronomy).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_summary() {
        let answer = "{\"summary\": \" \", \"hashtags\": [\"A\", \"B\", \"C\"], \"body\": \"y\"}";
        assert!(parse_generated(answer, Category::General).is_err());
    }
}
