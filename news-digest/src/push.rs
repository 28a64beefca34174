use crate::types::{DeliveryStatus, FetchConfig, Pusher, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

pub const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

/// Credentials and endpoint for the LINE Messaging API.
#[derive(Clone)]
pub struct LineConfig {
    pub endpoint: String,
    pub channel_token: String,
}

impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field("endpoint", &self.endpoint)
            .field("channel_token", &"***")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

/// One plain text message, shared by the push and reply APIs.
#[derive(Debug, Serialize)]
pub(crate) struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl<'a> TextMessage<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { kind: "text", text }
    }
}

impl<'a> PushRequest<'a> {
    fn text(message: &'a str, recipient: &'a str) -> Self {
        Self {
            to: recipient,
            messages: vec![TextMessage::new(message)],
        }
    }
}

pub struct LinePusher {
    client: Client,
    config: LineConfig,
}

impl LinePusher {
    pub fn new(config: LineConfig, fetch_config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: crate::fetcher::http_client(fetch_config)?,
            config,
        })
    }
}

#[async_trait]
impl Pusher for LinePusher {
    async fn push(&self, message: &str, recipient: &str) -> DeliveryStatus {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.channel_token)
            .json(&PushRequest::text(message, recipient))
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let http_status = response.status().as_u16();
                info!("Message delivered to {} (HTTP {})", recipient, http_status);
                DeliveryStatus::Delivered { http_status }
            }
            Ok(response) => {
                let http_status = response.status().as_u16();
                let reason = response.text().await.unwrap_or_default();
                warn!("LINE push rejected (HTTP {}): {}", http_status, reason);
                DeliveryStatus::Failed { http_status: Some(http_status), reason }
            }
            Err(e) => {
                warn!("LINE push failed: {}", e);
                DeliveryStatus::Failed { http_status: None, reason: e.to_string() }
            }
        }
    }
}
