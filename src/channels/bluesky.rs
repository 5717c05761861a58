//! Bluesky channel
//!
//! Talks XRPC directly: `createSession` for a token, `uploadBlob` for the
//! image and `createRecord` for the post. Posts are capped at 300 graphemes,
//! so the summary is shortened before anything else is dropped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ensure_success, read_social_image, Channel, ChannelError, ChannelResult};
use crate::config::BlueskyConfig;
use crate::models::{Asset, ChannelReceipt, PostDraft};
use crate::utils::{grapheme_len, truncate_graphemes};

/// Room the summary must keep before hashtags are dropped
const MIN_SUMMARY_GRAPHEMES: usize = 50;

pub struct BlueskyChannel {
    client: Client,
    handle: String,
    app_password: String,
    service: String,
    max_graphemes: usize,
}

#[derive(Debug, Serialize)]
struct CreateSession<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct UploadedBlob {
    blob: Value,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    uri: String,
}

impl BlueskyChannel {
    pub fn new(
        handle: impl Into<String>,
        app_password: impl Into<String>,
        timeout: Duration,
    ) -> ChannelResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            handle: handle.into(),
            app_password: app_password.into(),
            service: String::from("https://bsky.social"),
            max_graphemes: 300,
        })
    }

    /// Build from configuration; `None` when disabled or missing credentials
    pub fn from_config(config: &BlueskyConfig, timeout: Duration) -> ChannelResult<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let (Some(handle), Some(password)) = (config.handle.as_deref(), config.app_password.as_deref())
        else {
            return Ok(None);
        };

        let mut channel = Self::new(handle, password, timeout)?.with_service(&config.service);
        channel.max_graphemes = config.max_graphemes;
        Ok(Some(channel))
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into().trim_end_matches('/').to_string();
        self
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{method}", self.service)
    }

    async fn login(&self) -> ChannelResult<Session> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&CreateSession {
                identifier: &self.handle,
                password: &self.app_password,
            })
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    async fn upload_blob(&self, session: &Session, bytes: Vec<u8>, mime: &str) -> ChannelResult<Value> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await?;

        let uploaded: UploadedBlob = ensure_success(response).await?.json().await?;
        Ok(uploaded.blob)
    }
}

/// Compose post text within `max` graphemes
///
/// Full form is `summary`, link, hashtags. When too long the summary is cut
/// with `...`; if that leaves it under 50 graphemes the hashtags go instead.
pub fn compose_post_text(summary: &str, item_url: &str, hashtags: &str, max: usize) -> String {
    let link = format!("\n\n🔗 {item_url}");
    let tags = if hashtags.is_empty() {
        String::new()
    } else {
        format!("\n\n{hashtags}")
    };

    let full = format!("{summary}{link}{tags}");
    if grapheme_len(&full) <= max {
        return full;
    }

    let available = max.saturating_sub(grapheme_len(&link) + grapheme_len(&tags));
    if available > MIN_SUMMARY_GRAPHEMES {
        return format!("{}{link}{tags}", truncate_graphemes(summary, available));
    }

    let available = max.saturating_sub(grapheme_len(&link));
    format!("{}{link}", truncate_graphemes(summary, available))
}

/// Rich-text facets for the link and each hashtag (UTF-8 byte offsets)
fn build_facets(text: &str, item_url: &str) -> Vec<Value> {
    let mut facets = Vec::new();

    if let Some(start) = text.find(item_url) {
        facets.push(json!({
            "index": { "byteStart": start, "byteEnd": start + item_url.len() },
            "features": [{ "$type": "app.bsky.richtext.facet#link", "uri": item_url }],
        }));
    }

    let mut offset = 0;
    for word in text.split_inclusive(char::is_whitespace) {
        let trimmed = word.trim_end();
        if let Some(tag) = trimmed.strip_prefix('#') {
            if !tag.is_empty() && tag.chars().all(|c| c.is_alphanumeric() || c == '_') {
                facets.push(json!({
                    "index": { "byteStart": offset, "byteEnd": offset + trimmed.len() },
                    "features": [{ "$type": "app.bsky.richtext.facet#tag", "tag": tag }],
                }));
            }
        }
        offset += word.len();
    }

    facets
}

/// Record key is the last segment of an `at://` URI
fn record_key(uri: &str) -> Option<&str> {
    uri.rsplit('/').next().filter(|s| !s.is_empty())
}

#[async_trait]
impl Channel for BlueskyChannel {
    fn name(&self) -> &str {
        "bluesky"
    }

    async fn publish(&self, draft: &PostDraft, asset: Option<&Asset>) -> ChannelResult<ChannelReceipt> {
        let text = compose_post_text(
            &draft.content.summary,
            &draft.item_url,
            &draft.content.hashtag_line(),
            self.max_graphemes,
        );

        let session = self.login().await?;
        tracing::debug!(did = %session.did, "Logged into Bluesky");

        let mut record = json!({
            "$type": "app.bsky.feed.post",
            "text": text,
            "createdAt": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "facets": build_facets(&text, &draft.item_url),
        });

        if let Some((bytes, mime)) = read_social_image(asset).await? {
            tracing::info!(bytes = bytes.len(), "Uploading image to Bluesky");
            let blob = self.upload_blob(&session, bytes, &mime).await?;
            record["embed"] = json!({
                "$type": "app.bsky.embed.images",
                "images": [{ "alt": draft.alt_text(), "image": blob }],
            });
        }

        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .send()
            .await?;

        let created: CreatedRecord = ensure_success(response).await?.json().await?;
        let rkey = record_key(&created.uri).ok_or_else(|| ChannelError::Rejected {
            status: 200,
            message: format!("unexpected record uri '{}'", created.uri),
        })?;

        Ok(ChannelReceipt {
            channel: self.name().to_string(),
            url: format!("https://bsky.app/profile/{}/post/{rkey}", self.handle),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_post_is_untouched() {
        let text = compose_post_text("A tool", "https://github.com/a/b", "#Rust #CLI #Tools", 300);
        assert_eq!(text, "A tool\n\n🔗 https://github.com/a/b\n\n#Rust #CLI #Tools");
    }

    #[test]
    fn test_long_summary_is_shortened() {
        let summary = "x".repeat(400);
        let text = compose_post_text(&summary, "https://github.com/a/b", "#Rust #CLI #Tools", 300);

        assert_eq!(grapheme_len(&text), 300);
        assert!(text.contains("...\n\n🔗 https://github.com/a/b"));
        assert!(text.ends_with("#Rust #CLI #Tools"));
    }

    #[test]
    fn test_hashtags_dropped_when_space_is_tight() {
        let summary = "y".repeat(200);
        let url = format!("https://huggingface.co/{}", "m".repeat(200));
        let text = compose_post_text(&summary, &url, "#AI #MachineLearning #OpenSource", 300);

        assert!(grapheme_len(&text) <= 300);
        assert!(!text.contains('#'));
        assert!(text.ends_with(&url));
    }

    #[test]
    fn test_facets_use_byte_offsets() {
        let text = "Ünï\n\n🔗 https://x.io/a\n\n#Rust #CLI";
        let facets = build_facets(text, "https://x.io/a");

        assert_eq!(facets.len(), 3);
        let start = facets[0]["index"]["byteStart"].as_u64().unwrap() as usize;
        let end = facets[0]["index"]["byteEnd"].as_u64().unwrap() as usize;
        assert_eq!(&text[start..end], "https://x.io/a");
        assert_eq!(facets[1]["features"][0]["tag"], "Rust");
        assert_eq!(facets[2]["features"][0]["tag"], "CLI");
    }

    #[test]
    fn test_record_key() {
        assert_eq!(
            record_key("at://did:plc:abc/app.bsky.feed.post/3kxyz"),
            Some("3kxyz")
        );
        assert_eq!(record_key("at://did:plc:abc/"), None);
    }
}
