//! Snapshot sources
//!
//! A source returns the full current set of items on every fetch. Any failure is a
//! `FetchError`; the transport's own error type never leaves this module.

use crate::event::Item;
use crate::utils::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_STATUS: &str = "UNKNOWN";

/// Produces snapshots of the tracked items
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Item>, FetchError>;
}

/// Conversation id as sent by the API (string or number)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// One record of `GET /api/conversations`
#[derive(Debug, Deserialize)]
struct RawConversation {
    id: RawId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<RawConversation> for Item {
    fn from(raw: RawConversation) -> Self {
        Item {
            id: raw.id.into_string(),
            label: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            status: raw.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        }
    }
}

/// Either a bare array or a page object with `results`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConversationsPayload {
    List(Vec<RawConversation>),
    Page { results: Vec<RawConversation> },
}

impl ConversationsPayload {
    fn into_items(self) -> Vec<Item> {
        let records = match self {
            ConversationsPayload::List(records) => records,
            ConversationsPayload::Page { results } => results,
        };
        records.into_iter().map(Item::from).collect()
    }
}

/// Parse a conversations response body into items
pub fn parse_conversations(body: &str) -> Result<Vec<Item>, serde_json::Error> {
    serde_json::from_str::<ConversationsPayload>(body).map(ConversationsPayload::into_items)
}

/// Polls `GET {base_url}/api/conversations`
#[derive(Debug, Clone)]
pub struct HttpConversationSource {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpConversationSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/api/conversations", base_url.trim_end_matches('/')),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ObservationSource for HttpConversationSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let items = parse_conversations(&body).map_err(|e| FetchError::Decode {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        debug!(count = items.len(), "Fetched conversations");
        Ok(items)
    }
}
