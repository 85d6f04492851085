use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::tickets::Ticket;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx reply. `detail` is the backend's own message.
    #[error("{detail}")]
    Application { status: u16, detail: String },
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    pub org: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketList {
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub total: Option<usize>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Client for the assistant backend's `/chat` and `/tickets` endpoints.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let url = format!("{}/chat", self.base_url);
        debug!(url = %url, chars = request.message.chars().count(), "sending chat message");

        let response = self.client.post(&url).json(request).send().await?;
        let reply: ChatReply = decode(response, "Request failed").await?;

        debug!(ticket_id = ?reply.ticket_id, intent = ?reply.intent, "chat reply received");
        Ok(reply)
    }

    pub async fn list_tickets(&self) -> Result<TicketList, ApiError> {
        let url = format!("{}/tickets", self.base_url);
        debug!(url = %url, "fetching tickets");

        let response = self.client.get(&url).send().await?;
        let list: TicketList = decode(response, "Failed to load tickets").await?;

        debug!(count = list.tickets.len(), "tickets received");
        Ok(list)
    }
}

/// Read the whole body, then either decode it as `T` or turn it into an
/// `Application` error carrying the backend's `detail`.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    fallback_detail: &str,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let detail = error_detail(&body).unwrap_or_else(|| fallback_detail.to_string());
        warn!(status = status.as_u16(), detail = %detail, "backend returned an error");
        return Err(ApiError::Application {
            status: status.as_u16(),
            detail,
        });
    }

    Ok(serde_json::from_slice(&body)?)
}

fn error_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(detail) if !detail.is_empty() => Some(detail),
        serde_json::Value::Null => None,
        serde_json::Value::String(_) => None,
        // Validation errors carry a structured detail; show it compactly.
        other => Some(other.to_string()),
    }
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Application { status, .. } => StatusCode::from_u16(*status).ok(),
            ApiError::Network(err) => err.status(),
            ApiError::Decode(_) => None,
        }
    }
}
