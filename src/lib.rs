//! repocast - discovery queue and one-post-per-run publisher
//!
//! Finds notable open source projects and models, keeps a durable queue of
//! approved items balanced across content categories, and drains it one item
//! per invocation into a static-site post plus social channels.
//!
//! # Architecture
//!
//! - [`sources`] - Candidate sources (GitHub, Hacker News, Hugging Face)
//! - [`classifier`] - LLM-backed acceptance, topic and language checks
//! - [`storage`] - Queue, history, dedup index, state lock and archive
//! - [`pipeline`] - Discovery pass and the process-one publisher
//! - [`metadata`] - Full records for queued items
//! - [`assets`] - Hero image extraction
//! - [`content`] - Post text generation
//! - [`channels`] - Social publishing channels
//! - [`notifications`] - Run summaries for the operator
//! - [`config`] - Configuration management
//!
//! # Example
//!
//! ```no_run
//! use repocast::config::Config;
//! use repocast::storage::StateFiles;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let files = StateFiles::from_config(&config);
//!     let stock = files.queue.count_by_category()?;
//!     println!("{stock:?}");
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod channels;
pub mod classifier;
pub mod config;
pub mod content;
pub mod error;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod notifications;
pub mod pipeline;
pub mod sources;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, RepocastErrorTrait, Result};
    pub use crate::models::{Candidate, Category, FullRecord, GeneratedContent, QueueEntry};
    pub use crate::pipeline::{Discoverer, PublishOutcome, Publisher};
    pub use crate::storage::{HistoryStore, QueueStore, StateFiles};
}

// Direct re-exports for convenience
pub use models::{Candidate, Category, QueueEntry};
