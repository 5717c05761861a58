//! Twitter/X channel
//!
//! Posts through the X API v2 with an OAuth 2.0 user access token. Images go
//! through `/2/media/upload` first and are attached by media id.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ensure_success, read_social_image, Channel, ChannelError, ChannelResult};
use crate::config::TwitterConfig;
use crate::models::{Asset, ChannelReceipt, PostDraft};

pub struct TwitterChannel {
    client: Client,
    access_token: String,
    api_base: String,
}

#[derive(Debug, Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia>,
}

#[derive(Debug, Serialize)]
struct TweetMedia {
    media_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UploadedMedia {
    id: String,
}

impl TwitterChannel {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ChannelResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            access_token: access_token.into(),
            api_base: String::from("https://api.x.com"),
        })
    }

    /// Build from configuration; `None` when disabled or missing a token
    pub fn from_config(config: &TwitterConfig, timeout: Duration) -> ChannelResult<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(token) = config.access_token.as_deref() else {
            return Ok(None);
        };
        Ok(Some(Self::new(token, timeout)?.with_api_base(&config.api_base)))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn upload_media(&self, bytes: Vec<u8>, mime: &str) -> ChannelResult<String> {
        let part = Part::bytes(bytes)
            .file_name("image")
            .mime_str(mime)?;
        let form = Form::new()
            .part("media", part)
            .text("media_category", "tweet_image");

        let response = self
            .client
            .post(format!("{}/2/media/upload", self.api_base))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;

        let uploaded: DataEnvelope<UploadedMedia> = ensure_success(response).await?.json().await?;
        Ok(uploaded.data.id)
    }
}

#[async_trait]
impl Channel for TwitterChannel {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn publish(&self, draft: &PostDraft, asset: Option<&Asset>) -> ChannelResult<ChannelReceipt> {
        let text = draft.long_text();

        let media_id = match read_social_image(asset).await? {
            Some((bytes, mime)) => {
                tracing::info!(bytes = bytes.len(), "Uploading image to Twitter");
                Some(self.upload_media(bytes, &mime).await?)
            }
            None => None,
        };

        let request = TweetRequest {
            text: &text,
            media: media_id.map(|id| TweetMedia { media_ids: vec![id] }),
        };

        let response = self
            .client
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let created: DataEnvelope<CreatedTweet> = ensure_success(response).await?.json().await?;
        if created.data.id.is_empty() {
            return Err(ChannelError::Rejected {
                status: 200,
                message: String::from("tweet created without an id"),
            });
        }

        Ok(ChannelReceipt {
            channel: self.name().to_string(),
            url: format!("https://twitter.com/i/web/status/{}", created.data.id),
        })
    }
}
