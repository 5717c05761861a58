//! Run summary notifications
//!
//! After a publish attempt the operator gets one chat message describing what
//! happened. Notification is best effort: [`Notifier::notify`] reports success
//! as a `bool` and never fails the run.
//!
//! ```text
//!  Publisher ──► Notification ──► Notifier (Telegram, ...)
//! ```

pub mod telegram;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::channels::ChannelOutcome;
use crate::models::Category;

pub use telegram::TelegramNotifier;

/// Kind of event being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Item archived and pushed to channels
    Published,
    /// Item dropped below the popularity minimum
    Rejected,
}

impl NotificationKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Published => "🚀",
            Self::Rejected => "🚫",
        }
    }
}

/// Summary of one publish run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub category: Category,
    pub name: String,
    pub item_url: String,
    pub summary: String,
    pub archive_url: Option<String>,
    pub channels: Vec<ChannelOutcome>,
}

impl Notification {
    pub fn published(
        category: Category,
        name: impl Into<String>,
        item_url: impl Into<String>,
        summary: impl Into<String>,
        archive_url: impl Into<String>,
        channels: Vec<ChannelOutcome>,
    ) -> Self {
        Self {
            kind: NotificationKind::Published,
            category,
            name: name.into(),
            item_url: item_url.into(),
            summary: summary.into(),
            archive_url: Some(archive_url.into()),
            channels,
        }
    }

    pub fn rejected(
        category: Category,
        name: impl Into<String>,
        item_url: impl Into<String>,
        popularity: u64,
        minimum: u64,
    ) -> Self {
        Self {
            kind: NotificationKind::Rejected,
            category,
            name: name.into(),
            item_url: item_url.into(),
            summary: format!(
                "Only {popularity} {} (minimum {minimum}), removed from queue",
                category.popularity_label()
            ),
            archive_url: None,
            channels: Vec::new(),
        }
    }

    /// Names of channels that produced a receipt
    pub fn succeeded_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.succeeded())
            .map(|c| c.channel.as_str())
            .collect()
    }

    /// Render as Telegram-flavoured Markdown
    pub fn render_markdown(&self) -> String {
        let noun = match self.category {
            Category::ModelHub => "Model",
            _ => "Repo",
        };
        let headline = match self.kind {
            NotificationKind::Published => format!("New {noun} Posted!"),
            NotificationKind::Rejected => format!("{noun} Skipped"),
        };
        let source_label = match self.category {
            Category::ModelHub => "View on Hugging Face",
            _ => "View on GitHub",
        };

        let mut message = format!(
            "{} *{headline}*\n\n{} *Category:* {}\n📦 *{}*\n\n📝 {}\n\n🔗 [{source_label}]({})",
            self.kind.emoji(),
            self.category.emoji(),
            self.category.label(),
            self.name,
            self.summary,
            self.item_url,
        );

        if let Some(archive_url) = &self.archive_url {
            message.push_str(&format!("\n📄 [Read Full Article]({archive_url})"));
        }

        for outcome in &self.channels {
            match &outcome.receipt {
                Some(receipt) => message.push_str(&format!(
                    "\n{} [View on {}]({})",
                    channel_emoji(&outcome.channel),
                    channel_label(&outcome.channel),
                    receipt.url
                )),
                None => message.push_str(&format!(
                    "\n⚠️ {} failed",
                    channel_label(&outcome.channel)
                )),
            }
        }

        message
    }
}

fn channel_emoji(channel: &str) -> &'static str {
    match channel {
        "twitter" => "🐦",
        "bluesky" => "🦋",
        _ => "📣",
    }
}

fn channel_label(channel: &str) -> String {
    match channel {
        "twitter" => String::from("Twitter"),
        "bluesky" => String::from("Bluesky"),
        other => other.to_string(),
    }
}

/// Best-effort summary delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver a notification; `false` when delivery failed
    async fn notify(&self, notification: &Notification) -> bool;
}
