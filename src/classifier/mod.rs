//! Oracle-backed candidate classification
//!
//! Three binary questions are asked of the LLM:
//!
//! - `decide`: is this candidate worth publishing in its category?
//! - `is_on_topic`: is an astronomy candidate really about astronomy?
//! - `is_in_target_language`: is the listing written in the target language?
//!
//! Each returns a [`Verdict`]. An oracle failure after retries is `Deferred`,
//! and the caller resolves it with a [`FailurePolicy`]: acceptance and topic
//! checks fail closed, the language screen fails open.

use std::sync::Arc;

use crate::config::{Config, PerCategory};
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::models::{Candidate, Category};
use crate::utils::retry::{with_retry_if, RetryConfig};
use crate::utils::{normalize_whitespace, truncate_text};

/// Outcome of one classification question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
    /// Oracle could not answer; carries the reason
    Deferred(String),
}

/// How a `Deferred` verdict is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Treat an unanswered question as "no"
    FailClosed,
    /// Treat an unanswered question as "yes"
    FailOpen,
}

impl Verdict {
    /// Strict answer parsing: exactly `YES` after trim and uppercase
    pub fn from_answer(answer: &str) -> Self {
        if answer.trim().to_uppercase() == "YES" {
            Self::Accept
        } else {
            Self::Reject
        }
    }

    pub fn resolve(&self, policy: FailurePolicy) -> bool {
        match self {
            Self::Accept => true,
            Self::Reject => false,
            Self::Deferred(_) => policy == FailurePolicy::FailOpen,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

/// Popularity short-circuit that accepts without consulting the oracle
#[derive(Debug, Clone, Copy)]
pub struct AutoApprovePolicy {
    ceilings: PerCategory<u64>,
}

impl AutoApprovePolicy {
    pub fn new(ceilings: PerCategory<u64>) -> Self {
        Self { ceilings }
    }

    /// Popularity strictly above the category ceiling
    pub fn applies(&self, candidate: &Candidate, category: Category) -> bool {
        candidate.popularity > self.ceilings.get(category)
    }

    pub fn ceiling(&self, category: Category) -> u64 {
        self.ceilings.get(category)
    }
}

pub struct Classifier {
    llm: Arc<dyn LlmClient>,
    auto_approve: AutoApprovePolicy,
    retry: RetryConfig,
    prompt_char_limit: usize,
    max_tokens: u32,
    target_language: String,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Config) -> Self {
        Self {
            llm,
            auto_approve: AutoApprovePolicy::new(config.thresholds.auto_approve),
            retry: RetryConfig::with_delays(
                config.llm.max_retries,
                config.llm.retry_base_delay_ms,
                config.llm.retry_base_delay_ms.saturating_mul(8),
            ),
            prompt_char_limit: config.llm.prompt_char_limit,
            max_tokens: config.llm.classify_max_tokens,
            target_language: config.llm.target_language.clone(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn auto_approve(&self) -> &AutoApprovePolicy {
        &self.auto_approve
    }

    /// Acceptance decision for a candidate in a category
    ///
    /// Astronomy candidates must pass the topic check first; popularity never
    /// bypasses it.
    pub async fn decide(&self, candidate: &Candidate, category: Category) -> Verdict {
        if category == Category::Astronomy {
            match self.is_on_topic(candidate).await {
                Verdict::Accept => {}
                other => {
                    tracing::info!(
                        name = %candidate.display_name,
                        verdict = ?other,
                        "Not on topic for astronomy"
                    );
                    return other;
                }
            }
        }

        if self.auto_approve.applies(candidate, category) {
            tracing::info!(
                name = %candidate.display_name,
                popularity = candidate.popularity,
                ceiling = self.auto_approve.ceiling(category),
                "Auto-approved by popularity"
            );
            return Verdict::Accept;
        }

        let verdict = self.ask(self.acceptance_prompt(candidate, category)).await;
        tracing::info!(
            name = %candidate.display_name,
            category = %category,
            verdict = ?verdict,
            "Classified candidate"
        );
        verdict
    }

    /// Whether an astronomy candidate is genuinely about astronomy
    pub async fn is_on_topic(&self, candidate: &Candidate) -> Verdict {
        let prompt = format!(
            "Is this software project genuinely about astronomy, astrophysics, or space science \
             (observing, telescopes, sky surveys, celestial mechanics, astronomical data)?\n\
             Words like \"transit\", \"orbit\", \"star\" or \"galaxy\" used as product names or \
             metaphors do not count.\n\n{}\n\n\
             Answer with ONLY \"YES\" or \"NO\".",
            self.describe(candidate)
        );
        self.ask(prompt).await
    }

    /// Whether the listing is written in the target language
    pub async fn is_in_target_language(&self, candidate: &Candidate) -> Verdict {
        let prompt = format!(
            "Is the following project name and description written primarily in {}?\n\n\
             Name: {}\nDescription: {}\n\n\
             Answer with ONLY \"YES\" or \"NO\".",
            self.target_language,
            candidate.display_name,
            truncate_text(&candidate.description, self.prompt_char_limit),
        );
        self.ask(prompt).await
    }

    fn describe(&self, candidate: &Candidate) -> String {
        format!(
            "Name: {}\nDescription: {}\nLanguage: {}\nPopularity: {}\nTopics: {}",
            candidate.display_name,
            truncate_text(&normalize_whitespace(&candidate.description), self.prompt_char_limit),
            candidate.primary_language,
            candidate.popularity,
            candidate.topics_line(),
        )
    }

    fn acceptance_prompt(&self, candidate: &Candidate, category: Category) -> String {
        let criteria = match category {
            Category::General => {
                "Accept developer tools that boost productivity, libraries or frameworks with broad \
                 appeal, educational resources, and projects that solve real problems.\n\
                 Reject cryptocurrency, meme coin or NFT projects, narrow backend plumbing, \
                 abandoned or low-quality repositories, spam, and projects with an unclear purpose."
            }
            Category::Astronomy => {
                "Accept tools, libraries, datasets and pipelines useful to astronomers, \
                 astrophysicists or amateur observers.\n\
                 Reject course homework, empty templates, personal dotfiles and projects with an \
                 unclear purpose."
            }
            Category::ModelHub => {
                "Accept models that are practically useful, well documented, or notable for the \
                 machine learning community.\n\
                 Reject test uploads, duplicates of other models without changes, and models \
                 with no description of what they do."
            }
        };

        format!(
            "Decide whether this {} item would interest a broad technical audience.\n\n{}\n\n{}\n\n\
             Answer with ONLY \"YES\" or \"NO\" - nothing else.",
            category.label(),
            self.describe(candidate),
            criteria,
        )
    }

    async fn ask(&self, prompt: String) -> Verdict {
        let request = CompletionRequest::new(prompt).with_max_tokens(self.max_tokens);

        let result = with_retry_if(
            &self.retry,
            || self.llm.complete(request.clone()),
            |e: &LlmError| e.is_recoverable(),
        )
        .await;

        match result {
            Ok(response) => Verdict::from_answer(&response.text),
            Err(e) => {
                tracing::warn!(
                    provider = self.llm.provider(),
                    model = self.llm.model(),
                    error = %e,
                    "Oracle call failed, verdict deferred"
                );
                Verdict::Deferred(e.to_string())
            }
        }
    }
}
