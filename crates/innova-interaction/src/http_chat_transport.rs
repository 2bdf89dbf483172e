//! HttpChatTransport - REST client for the InnovaChat service.
//!
//! Endpoints:
//! - `POST /api/chat`
//! - `POST /api/generate_title`
//! - `GET /api/messages?sessionId=...`
//! - `DELETE /api/chats/{sessionId}`

use async_trait::async_trait;
use innova_core::error::{InnovaError, Result as InnovaResult, TransportError};
use innova_core::session::{parse_remote_timestamp, Message, RemoteId, Sender};
use innova_core::transport::{ChatReply, ChatTransport};
use innova_infrastructure::config_service::{normalize_base_url, ClientConfig};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport that talks to the InnovaChat HTTP API.
#[derive(Clone)]
pub struct HttpChatTransport {
    client: Client,
    base_url: String,
}

impl HttpChatTransport {
    /// Creates a transport for `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: impl AsRef<str>) -> InnovaResult<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url.as_ref())?,
        })
    }

    /// Builds a transport from client configuration, honoring the request timeout.
    pub fn from_config(config: &ClientConfig) -> InnovaResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| InnovaError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: normalize_base_url(&config.backend_url)?,
        })
    }

    /// Replaces the underlying HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of one remote chat; the id is appended as a single encoded segment.
    fn chat_url(&self, backend_session_id: &RemoteId) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.url("/api/chats"))
            .map_err(|e| TransportError::protocol(format!("Invalid chat URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::protocol("Backend URL cannot take path segments"))?
            .push(&backend_session_id.to_string());
        Ok(url)
    }

    /// Sends a request and checks the status; the body is left to the caller.
    async fn dispatch(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<reqwest::Response, TransportError> {
        tracing::debug!("[HttpChatTransport] Sending {}", endpoint);

        let response = request.send().await.map_err(|err| {
            tracing::warn!("[HttpChatTransport] {} failed: {}", endpoint, err);
            TransportError::network(format!("Request to {} failed: {}", endpoint, err))
        })?;

        let status = response.status();
        tracing::debug!("[HttpChatTransport] {} -> {}", endpoint, status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_http_error(status, &body))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, TransportError> {
        let response = self.dispatch(request, endpoint).await?;
        let bytes = response.bytes().await.map_err(|err| {
            TransportError::network(format!("Failed to read response from {}: {}", endpoint, err))
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            TransportError::protocol(format!("Invalid response from {}: {}", endpoint, err))
        })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send_chat_message(
        &self,
        text: &str,
        backend_session_id: Option<&RemoteId>,
    ) -> Result<ChatReply, TransportError> {
        let body = ChatRequest {
            message: text,
            session_id: backend_session_id,
        };
        let request = self.client.post(self.url("/api/chat")).json(&body);
        let response: ChatResponse = self.execute(request, "POST /api/chat").await?;
        response.into_reply()
    }

    async fn request_title(&self, backend_session_id: &RemoteId) -> Result<String, TransportError> {
        let body = TitleRequest {
            session_id: backend_session_id,
        };
        let request = self.client.post(self.url("/api/generate_title")).json(&body);
        let response: TitleResponse = self.execute(request, "POST /api/generate_title").await?;

        response
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransportError::protocol("title response has no title"))
    }

    async fn delete_remote_session(
        &self,
        backend_session_id: &RemoteId,
    ) -> Result<(), TransportError> {
        let url = self.chat_url(backend_session_id)?;
        let endpoint = format!("DELETE {}", url.path());
        let request = self.client.delete(url);
        self.dispatch(request, &endpoint).await?;
        Ok(())
    }

    async fn fetch_messages(
        &self,
        backend_session_id: &RemoteId,
    ) -> Result<Vec<Message>, TransportError> {
        let request = self
            .client
            .get(self.url("/api/messages"))
            .query(&[("sessionId", backend_session_id.to_string())]);
        let response: MessagesResponse = self.execute(request, "GET /api/messages").await?;

        response
            .messages
            .into_iter()
            .map(RemoteMessage::into_message)
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: Option<&'a RemoteId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitleRequest<'a> {
    session_id: &'a RemoteId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    #[serde(default)]
    session_id: Option<RemoteId>,
    #[serde(default)]
    bot_message: Option<RemoteMessage>,
    #[serde(default)]
    session_title: Option<String>,
}

impl ChatResponse {
    fn into_reply(self) -> Result<ChatReply, TransportError> {
        let bot = self
            .bot_message
            .ok_or_else(|| TransportError::protocol("chat response has no botMessage"))?;
        let content = bot
            .content
            .ok_or_else(|| TransportError::protocol("chat response botMessage has no content"))?;

        let mut bot_message = Message::bot(content);
        if let Some(ts) = bot.timestamp.as_ref().and_then(timestamp_from_value) {
            bot_message = bot_message.with_timestamp(ts);
        }
        if let Some(id) = bot.id {
            bot_message = bot_message.with_id(id);
        }

        Ok(ChatReply {
            backend_session_id: self.session_id,
            bot_message,
            generated_title: self
                .session_title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct RemoteMessage {
    #[serde(default)]
    id: Option<RemoteId>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
}

impl RemoteMessage {
    fn into_message(self) -> Result<Message, TransportError> {
        let sender = match self.sender.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("user") => Sender::User,
            Some("bot") | Some("assistant") | Some("model") => Sender::Bot,
            other => {
                return Err(TransportError::protocol(format!(
                    "message has unknown sender {:?}",
                    other
                )));
            }
        };
        let content = self
            .content
            .ok_or_else(|| TransportError::protocol("message has no content"))?;

        let mut message = match sender {
            Sender::User => Message::user(content),
            Sender::Bot => Message::bot(content),
        };
        if let Some(ts) = self.timestamp.as_ref().and_then(timestamp_from_value) {
            message = message.with_timestamp(ts);
        }
        if let Some(id) = self.id {
            message = message.with_id(id);
        }
        Ok(message)
    }
}

#[derive(Deserialize)]
struct TitleResponse {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<RemoteMessage>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn timestamp_from_value(value: &serde_json::Value) -> Option<chrono::DateTime<chrono::Utc>> {
    value.as_str().and_then(parse_remote_timestamp)
}

fn map_http_error(status: StatusCode, body: &str) -> TransportError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|wrapper| wrapper.message.or(wrapper.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));

    TransportError::server(status.as_u16(), message)
}
