//! Telegram notifier
//!
//! Sends the run summary through the Bot API `sendMessage` method with
//! Markdown formatting.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Notification, Notifier};
use crate::channels::{ensure_success, ChannelResult};
use crate::config::TelegramConfig;

pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
    api_base: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> ChannelResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: String::from("https://api.telegram.org"),
        })
    }

    /// Build from configuration; `None` when disabled or missing credentials
    pub fn from_config(config: &TelegramConfig, timeout: Duration) -> ChannelResult<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let (Some(token), Some(chat_id)) = (config.bot_token.as_deref(), config.chat_id.as_deref())
        else {
            return Ok(None);
        };
        Ok(Some(Self::new(token, chat_id, timeout)?.with_api_base(&config.api_base)))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn send(&self, text: &str) -> ChannelResult<()> {
        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_base, self.bot_token))
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode: "Markdown",
                disable_web_page_preview: false,
            })
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, notification: &Notification) -> bool {
        match self.send(&notification.render_markdown()).await {
            Ok(()) => {
                tracing::info!(item = %notification.item_url, "Telegram notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Telegram notification failed");
                false
            }
        }
    }
}
