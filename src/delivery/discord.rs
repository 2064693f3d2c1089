use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{ChatSink, Embed, Post};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts messages through Discord's REST API with a bot token.
pub struct DiscordClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct AttachmentRef<'a> {
    id: u32,
    filename: &'a str,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "no_embeds")]
    embeds: &'a [Embed],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentRef<'a>>,
}

fn no_embeds(embeds: &&[Embed]) -> bool {
    embeds.is_empty()
}

impl DiscordClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|_| anyhow!("Discord token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent("DiscordBot (https://github.com/coinpulse/coinpulse, 0.1)")
            .default_headers(headers)
            .timeout(SEND_TIMEOUT)
            .build()?;

        Ok(DiscordClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ChatSink for DiscordClient {
    #[instrument(name = "DiscordSend", skip(self, post))]
    async fn send(&self, channel_id: &str, post: &Post) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let payload = MessagePayload {
            content: post.content.as_deref(),
            embeds: &post.embeds,
            attachments: post
                .attachment
                .iter()
                .map(|a| AttachmentRef {
                    id: 0,
                    filename: &a.filename,
                })
                .collect(),
        };

        let request = self.client.post(&url);
        let request = match &post.attachment {
            Some(attachment) => {
                let file = Part::bytes(attachment.data.clone())
                    .file_name(attachment.filename.clone())
                    .mime_str(&attachment.content_type)?;
                let form = Form::new()
                    .text("payload_json", serde_json::to_string(&payload)?)
                    .part("files[0]", file);
                request.multipart(form)
            }
            None => request.json(&payload),
        };

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for channel: {}", e, channel_id))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "HTTP error: {} for channel: {}: {}",
                status,
                channel_id,
                body
            ));
        }

        debug!(%channel_id, "Message delivered");
        Ok(())
    }
}
