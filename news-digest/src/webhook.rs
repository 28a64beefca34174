//! LINE webhook that answers any text message posted in a group with that
//! group's ID. The ID is the push recipient (`LINE_GROUP_ID`), and LINE only
//! reveals it through webhook events.

use crate::push::TextMessage;
use crate::types::{DeliveryStatus, FetchConfig, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

pub const LINE_REPLY_ENDPOINT: &str = "https://api.line.me/v2/bot/message/reply";
pub const CALLBACK_PATH: &str = "/callback";
pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

/// Check `X-Line-Signature`: base64 of HMAC-SHA256 over the raw body, keyed
/// with the channel secret. Compared in constant time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub group_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub reply_token: String,
    pub text: String,
}

pub fn group_id_text(group_id: &str) -> String {
    format!("👋 群組 ID 是：{}", group_id)
}

/// One reply per text message event that came from a group.
pub fn group_id_replies(body: &WebhookBody) -> Vec<Reply> {
    body.events
        .iter()
        .filter(|e| e.kind == "message")
        .filter(|e| e.message.as_ref().is_some_and(|m| m.kind == "text"))
        .filter_map(|e| {
            let source = e.source.as_ref().filter(|s| s.kind == "group")?;
            let group_id = source.group_id.as_deref()?;
            let reply_token = e.reply_token.clone()?;
            Some(Reply { reply_token, text: group_id_text(group_id) })
        })
        .collect()
}

/// Sends a reply bound to an event's reply token.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, text: &str) -> DeliveryStatus;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

/// Messaging API reply client.
pub struct LineReplier {
    client: Client,
    endpoint: String,
    channel_token: String,
}

impl LineReplier {
    pub fn new(channel_token: String, fetch_config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: crate::fetcher::http_client(fetch_config)?,
            endpoint: LINE_REPLY_ENDPOINT.to_string(),
            channel_token,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ReplySender for LineReplier {
    async fn reply(&self, reply_token: &str, text: &str) -> DeliveryStatus {
        let request = ReplyRequest {
            reply_token,
            messages: vec![TextMessage::new(text)],
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.channel_token)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => DeliveryStatus::Delivered {
                http_status: response.status().as_u16(),
            },
            Ok(response) => {
                let http_status = response.status().as_u16();
                let reason = response.text().await.unwrap_or_default();
                DeliveryStatus::Failed { http_status: Some(http_status), reason }
            }
            Err(e) => DeliveryStatus::Failed { http_status: None, reason: e.to_string() },
        }
    }
}

#[derive(Clone)]
pub struct WebhookState {
    channel_secret: Arc<str>,
    replier: Arc<dyn ReplySender>,
}

impl WebhookState {
    pub fn new(channel_secret: impl Into<Arc<str>>, replier: Arc<dyn ReplySender>) -> Self {
        Self { channel_secret: channel_secret.into(), replier }
    }
}

/// `POST /callback`. A bad signature or an unreadable body is a 400;
/// failed replies are logged and still acknowledged.
pub async fn callback(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        warn!("Webhook call without {}", SIGNATURE_HEADER);
        return StatusCode::BAD_REQUEST;
    };
    if !verify_signature(&state.channel_secret, &body, signature) {
        warn!("Webhook signature mismatch");
        return StatusCode::BAD_REQUEST;
    }

    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Unreadable webhook body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    debug!("Webhook delivered {} event(s)", payload.events.len());

    for reply in group_id_replies(&payload) {
        let status = state.replier.reply(&reply.reply_token, &reply.text).await;
        if status.is_success() {
            info!("Replied: {}", reply.text);
        } else {
            warn!("Reply failed: {:?}", status);
        }
    }
    StatusCode::OK
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route(CALLBACK_PATH, post(callback)).with_state(state)
}

pub async fn serve(bind: &str, state: WebhookState) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Webhook listening on http://{}{}", bind, CALLBACK_PATH);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::sync::Mutex;

    const SECRET: &str = "channel-secret";

    const GROUP_MESSAGE: &str = r#"{
        "destination": "U0000",
        "events": [
            {
                "type": "message",
                "replyToken": "reply-1",
                "source": { "type": "group", "groupId": "C4af4980629", "userId": "U1234" },
                "message": { "type": "text", "id": "1", "text": "hi" }
            },
            {
                "type": "message",
                "replyToken": "reply-2",
                "source": { "type": "user", "userId": "U1234" },
                "message": { "type": "text", "id": "2", "text": "hi" }
            },
            {
                "type": "message",
                "replyToken": "reply-3",
                "source": { "type": "group", "groupId": "C4af4980629" },
                "message": { "type": "sticker", "id": "3" }
            },
            {
                "type": "join",
                "replyToken": "reply-4",
                "source": { "type": "group", "groupId": "C4af4980629" }
            }
        ]
    }"#;

    fn sign(body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    #[derive(Default)]
    struct RecordingReplier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ReplySender for RecordingReplier {
        async fn reply(&self, reply_token: &str, text: &str) -> DeliveryStatus {
            self.sent.lock().unwrap().push((reply_token.to_string(), text.to_string()));
            DeliveryStatus::Delivered { http_status: 200 }
        }
    }

    fn headers(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn signature_is_checked_against_the_raw_body() {
        let signature = sign(GROUP_MESSAGE);
        assert!(verify_signature(SECRET, GROUP_MESSAGE.as_bytes(), &signature));
        assert!(!verify_signature("other-secret", GROUP_MESSAGE.as_bytes(), &signature));
        assert!(!verify_signature(SECRET, b"{}", &signature));
        assert!(!verify_signature(SECRET, GROUP_MESSAGE.as_bytes(), "not base64!"));
    }

    #[test]
    fn only_group_text_messages_get_a_reply() {
        let body: WebhookBody = serde_json::from_str(GROUP_MESSAGE).unwrap();
        assert_eq!(
            group_id_replies(&body),
            vec![Reply {
                reply_token: "reply-1".to_string(),
                text: "👋 群組 ID 是：C4af4980629".to_string(),
            }]
        );
    }

    #[test]
    fn reply_payload_matches_line_reply_shape() {
        let request = ReplyRequest { reply_token: "reply-1", messages: vec![TextMessage::new("hi")] };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            serde_json::json!({
                "replyToken": "reply-1",
                "messages": [{ "type": "text", "text": "hi" }]
            })
        );
    }

    #[tokio::test]
    async fn callback_replies_with_group_id() {
        let replier = Arc::new(RecordingReplier::default());
        let state = WebhookState::new(SECRET, replier.clone());

        let status = callback(State(state), headers(&sign(GROUP_MESSAGE)), Bytes::from(GROUP_MESSAGE)).await;

        assert_eq!(status, StatusCode::OK);
        let sent = replier.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("reply-1".to_string(), group_id_text("C4af4980629"))]);
    }

    #[tokio::test]
    async fn callback_rejects_unsigned_or_forged_calls() {
        let replier = Arc::new(RecordingReplier::default());
        let state = WebhookState::new(SECRET, replier.clone());

        let forged = callback(State(state.clone()), headers(&sign("{}")), Bytes::from(GROUP_MESSAGE)).await;
        assert_eq!(forged, StatusCode::BAD_REQUEST);

        let unsigned = callback(State(state.clone()), HeaderMap::new(), Bytes::from(GROUP_MESSAGE)).await;
        assert_eq!(unsigned, StatusCode::BAD_REQUEST);

        let garbage = "not json";
        let unreadable = callback(State(state), headers(&sign(garbage)), Bytes::from(garbage)).await;
        assert_eq!(unreadable, StatusCode::BAD_REQUEST);

        assert!(replier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn verification_call_without_events_is_acknowledged() {
        let body = r#"{"destination":"U0000","events":[]}"#;
        let state = WebhookState::new(SECRET, Arc::new(RecordingReplier::default()));
        assert_eq!(callback(State(state), headers(&sign(body)), Bytes::from(body)).await, StatusCode::OK);
    }
}
