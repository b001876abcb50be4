//! Slack Web API client.
//!
//! Only `chat.postMessage` is needed: both the reviewer notifications and the
//! event replies go through [`MessageTransport::post_message`].

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::blocks::MessageBlock;

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a `chat.postMessage` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessage {
    /// Channel name, channel id or user id.
    pub channel: String,
    /// Plain text; the notification fallback when blocks are present.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<MessageBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl PostMessage {
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            blocks: None,
            thread_ts: None,
        }
    }

    pub fn in_thread(mut self, thread_ts: Option<String>) -> Self {
        self.thread_ts = thread_ts;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("Slack request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Slack API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Slack rate limit hit (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
    #[error("Slack API error: {0}")]
    Api(String),
}

/// The "post a message to a destination" primitive.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn post_message(&self, message: &PostMessage) -> Result<(), SlackError>;
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(token: String) -> anyhow::Result<Self> {
        Self::with_base_url(token, DEFAULT_SLACK_API_BASE.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mergemate/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from `SLACK_BOT_TOKEN` (and optional `SLACK_API_BASE_URL`).
    pub fn from_env() -> anyhow::Result<Self> {
        let token = require_bot_token(env::var("SLACK_BOT_TOKEN").ok())?;
        let base_url = env::var("SLACK_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SLACK_API_BASE.to_string());
        Self::with_base_url(token, base_url)
    }
}

/// Validate the bot token read from the environment.
///
/// A missing or blank token is a configuration error.
pub fn require_bot_token(value: Option<String>) -> anyhow::Result<String> {
    value
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| anyhow!("SLACK_BOT_TOKEN environment variable is required"))
}

#[async_trait]
impl MessageTransport for SlackClient {
    async fn post_message(&self, message: &PostMessage) -> Result<(), SlackError> {
        let url = format!("{}/chat.postMessage", self.base_url);

        info!("Posting Slack message to {}", message.channel);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            error!("Slack rate limit hit posting to {}", message.channel);
            return Err(SlackError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Slack API error: {} - {}", status, body);
            return Err(SlackError::Status { status, body });
        }

        let body: PostMessageResponse = response.json().await?;
        check_response(body, &message.channel)
    }
}

fn check_response(body: PostMessageResponse, channel: &str) -> Result<(), SlackError> {
    if body.ok {
        info!(
            "Posted Slack message to {} (ts: {})",
            channel,
            body.ts.as_deref().unwrap_or("unknown")
        );
        Ok(())
    } else {
        let reason = body.error.unwrap_or_else(|| "unknown_error".to_string());
        error!("Slack rejected message to {}: {}", channel, reason);
        Err(SlackError::Api(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_message_omits_unset_fields() {
        let message = PostMessage::text("C123", "hello");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({ "channel": "C123", "text": "hello" }));
    }

    #[test]
    fn test_post_message_in_thread() {
        let message = PostMessage::text("C123", "hello").in_thread(Some("1700000000.000100".into()));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["thread_ts"], "1700000000.000100");
    }

    #[test]
    fn test_check_response_ok() {
        let body: PostMessageResponse =
            serde_json::from_value(json!({ "ok": true, "ts": "1.2" })).unwrap();
        assert!(check_response(body, "C1").is_ok());
    }

    #[test]
    fn test_check_response_api_error() {
        let body: PostMessageResponse =
            serde_json::from_value(json!({ "ok": false, "error": "channel_not_found" })).unwrap();
        let err = check_response(body, "C1").unwrap_err();
        assert!(matches!(err, SlackError::Api(ref reason) if reason == "channel_not_found"));
    }

    #[test]
    fn test_check_response_error_without_reason() {
        let body: PostMessageResponse = serde_json::from_value(json!({ "ok": false })).unwrap();
        let err = check_response(body, "C1").unwrap_err();
        assert_eq!(err.to_string(), "Slack API error: unknown_error");
    }

    #[test]
    fn test_require_bot_token() {
        assert!(require_bot_token(None).is_err());
        assert!(require_bot_token(Some("".to_string())).is_err());
        assert!(require_bot_token(Some("  ".to_string())).is_err());
        assert_eq!(
            require_bot_token(Some("xoxb-token".to_string())).unwrap(),
            "xoxb-token"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            SlackClient::with_base_url("t".into(), "http://localhost:9000/api/".into()).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000/api");
    }

    #[test]
    fn test_default_client_targets_slack_api() {
        let client = SlackClient::new("xoxb-token".into()).unwrap();
        assert_eq!(client.base_url, DEFAULT_SLACK_API_BASE);
        assert_eq!(client.token, "xoxb-token");
    }
}
