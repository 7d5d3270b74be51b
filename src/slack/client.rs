//! Slack Web API client.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::SlackConfig;
use crate::slack::blocks::Block;
use crate::slack::error::SlackError;

/// Reference to a posted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Channel the message was posted to.
    pub channel: String,
    /// Platform timestamp; doubles as the message ID.
    pub ts: String,
}

/// Successful result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The message was deleted by this call.
    Deleted,
    /// The message did not exist anymore.
    AlreadyGone,
}

/// A message from channel history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryMessage {
    /// Message timestamp.
    pub ts: String,
    /// Author user ID.
    #[serde(default)]
    pub user: Option<String>,
    /// Message text.
    #[serde(default)]
    pub text: String,
}

/// Operations the relay needs from the messaging platform.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Post a block message; `fallback_text` is shown in notifications.
    async fn post_message(
        &self,
        channel: &str,
        blocks: &[Block],
        fallback_text: &str,
    ) -> Result<MessageRef, SlackError>;

    /// Delete a message. A message that no longer exists is not an error.
    async fn delete_message(&self, channel: &str, ts: &str) -> Result<DeleteOutcome, SlackError>;

    /// Most recent messages of a channel, newest first.
    async fn list_history(&self, channel: &str, limit: u32)
        -> Result<Vec<HistoryMessage>, SlackError>;

    /// User ID of the bot behind the token.
    async fn auth_test(&self) -> Result<String, SlackError>;
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    channel: String,
    ts: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    user_id: String,
}

/// HTTP client for the Slack Web API.
pub struct SlackClient {
    http: Client,
    api_base: String,
    token: String,
}

impl SlackClient {
    /// Create a client with a per-request timeout.
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SlackError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SlackError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &SlackConfig) -> Result<Self, SlackError> {
        Self::new(
            &config.bot_token,
            &config.api_base,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, SlackError> {
        let request = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.token)
            .json(&body);
        self.send(request).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let request = self
            .http
            .get(self.url(method))
            .bearer_auth(&self.token)
            .query(query);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SlackError> {
        let response = request
            .send()
            .await
            .map_err(|e| SlackError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1);
            return Err(SlackError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(SlackError::Http(status.as_u16()));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| SlackError::InvalidResponse(e.to_string()))?;
        parse_response(value)
    }
}

/// Check the `ok` flag of an API response and decode the payload.
pub fn parse_response<T: DeserializeOwned>(value: Value) -> Result<T, SlackError> {
    match value.get("ok").and_then(Value::as_bool) {
        Some(true) => {
            serde_json::from_value(value).map_err(|e| SlackError::InvalidResponse(e.to_string()))
        }
        Some(false) => {
            let code = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            Err(SlackError::from_code(code))
        }
        None => Err(SlackError::InvalidResponse(
            "missing \"ok\" field".to_string(),
        )),
    }
}

#[async_trait]
impl MessagingClient for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        blocks: &[Block],
        fallback_text: &str,
    ) -> Result<MessageRef, SlackError> {
        let response: PostMessageResponse = self
            .post(
                "chat.postMessage",
                json!({ "channel": channel, "blocks": blocks, "text": fallback_text }),
            )
            .await?;

        Ok(MessageRef {
            channel: response.channel,
            ts: response.ts,
        })
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<DeleteOutcome, SlackError> {
        match self
            .post::<Value>("chat.delete", json!({ "channel": channel, "ts": ts }))
            .await
        {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(SlackError::MessageNotFound) => Ok(DeleteOutcome::AlreadyGone),
            Err(e) => Err(e),
        }
    }

    async fn list_history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        let response: HistoryResponse = self
            .get(
                "conversations.history",
                &[("channel", channel.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(response.messages)
    }

    async fn auth_test(&self) -> Result<String, SlackError> {
        let response: AuthTestResponse = self.post("auth.test", json!({})).await?;
        Ok(response.user_id)
    }
}
