//! Telegram Bot API transport
//!
//! Sends messages to the configured chat and long-polls incoming updates for the
//! command listener. The bot token is part of every request URL, so request errors
//! are stripped of their URL before they are logged or returned.

use crate::notify::Notifier;
use crate::utils::DeliveryError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Upper bound for a single sendMessage request
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time on top of the long-poll timeout before the HTTP request gives up
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Incoming update from `getUpdates`
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

/// Message carried by an update
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Telegram Bot API client bound to one bot token and one default chat
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramClient {
    /// Create a client. `api_url` is the Bot API root, e.g. `https://api.telegram.org`.
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Send `text` to an arbitrary chat (one attempt)
    #[instrument(skip(self, text), fields(chat_id = %chat_id))]
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let body = SendMessageRequest { chat_id, text };
        let _: serde_json::Value = self.call("sendMessage", &body, SEND_TIMEOUT).await?;
        info!("Telegram message sent successfully");
        Ok(())
    }

    /// Long-poll for updates with `update_id >= offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, DeliveryError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &body, timeout + LONG_POLL_GRACE).await
    }

    async fn call<B, T>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, DeliveryError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(error = %e, method = %method, "Failed to reach Telegram API");
                DeliveryError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, method = %method, "Failed to read Telegram API response");
            DeliveryError::Transport(e.to_string())
        })?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                error!(status = %status, body = %text, method = %method, "Telegram API returned error");
                return Err(DeliveryError::Rejected {
                    status: status.as_u16(),
                    description: text,
                });
            }
            Err(e) => {
                error!(error = %e, method = %method, "Failed to decode Telegram API response");
                return Err(DeliveryError::Decode(e.to_string()));
            }
        };

        if !status.is_success() || !envelope.ok {
            let description = envelope
                .description
                .unwrap_or_else(|| "unknown Telegram API error".to_string());
            error!(status = %status, description = %description, method = %method, "Telegram API returned error");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description,
            });
        }

        debug!(method = %method, "Telegram API call succeeded");
        envelope
            .result
            .ok_or_else(|| DeliveryError::Decode(format!("{} response has no result", method)))
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        self.send_message(&self.chat_id, text).await
    }
}
