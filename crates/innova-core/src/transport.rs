//! Transport interface to the remote chat service.
//!
//! The HTTP implementation lives in `innova-interaction`; the reconciler
//! only sees this trait, so tests can script replies without a server.

use crate::error::TransportError;
use crate::session::{Message, RemoteId};
use async_trait::async_trait;

/// A successful reply to a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Backend session id, present when the service created or confirmed one.
    pub backend_session_id: Option<RemoteId>,
    /// The bot's answer. Its timestamp is the service's when it sent one.
    pub bot_message: Message,
    /// Title the service generated alongside the reply, if any.
    pub generated_title: Option<String>,
}

/// Client side of the InnovaChat HTTP API.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a user message.
    ///
    /// `backend_session_id` is `None` until the session has been promoted,
    /// and the promoted id from then on.
    async fn send_chat_message(
        &self,
        text: &str,
        backend_session_id: Option<&RemoteId>,
    ) -> Result<ChatReply, TransportError>;

    /// Asks the service to title a session from its history.
    async fn request_title(&self, backend_session_id: &RemoteId) -> Result<String, TransportError>;

    /// Deletes the backend counterpart of a session.
    async fn delete_remote_session(&self, backend_session_id: &RemoteId)
        -> Result<(), TransportError>;

    /// Fetches the stored history of a backend session, oldest first.
    async fn fetch_messages(
        &self,
        backend_session_id: &RemoteId,
    ) -> Result<Vec<Message>, TransportError>;
}
