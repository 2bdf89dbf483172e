//! Chat session domain model.

use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title every session starts with until a real one is generated.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// An identifier assigned by the remote service.
///
/// The service hands out SQLite row ids, but older deployments echoed them
/// back as strings; both shapes are kept verbatim so the value sent back is
/// exactly the value received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Number(n) => write!(f, "{}", n),
            RemoteId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RemoteId {
    fn from(value: i64) -> Self {
        RemoteId::Number(value)
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        RemoteId::Text(value.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(value: String) -> Self {
        RemoteId::Text(value)
    }
}

/// A chat session as held on the client.
///
/// `local_id` is minted on the client and never changes. `backend_id` stays
/// `None` until the first successful exchange with the service and is then
/// bound for good; see [`crate::session::SessionStore::promote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub local_id: String,
    #[serde(default)]
    pub backend_id: Option<RemoteId>,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// A fresh, empty session with a new local id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            backend_id: None,
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True while the title is still the placeholder.
    pub fn has_placeholder_title(&self) -> bool {
        self.title == NEW_CHAT_TITLE
    }

    /// The first message the user sent, if any.
    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_user())
    }

    pub(crate) fn touch(&mut self) {
        let now = Utc::now();
        // Keep updated_at monotonic even if the wall clock steps back.
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at
        };
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields that may be merged into an existing session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub backend_id: Option<RemoteId>,
}

impl SessionPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn backend_id(backend_id: RemoteId) -> Self {
        Self {
            backend_id: Some(backend_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.backend_id.is_none()
    }
}

/// Result of trying to bind a backend id to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    /// The session had no backend id and now has this one.
    Promoted,
    /// The session was already bound to the same id.
    Unchanged,
    /// Refused: the session is already bound to `existing`.
    Rejected { existing: RemoteId },
    /// Refused: the id belongs to the session `holder` (a local id).
    Taken { holder: String },
}

impl Promotion {
    /// True for both refusal variants.
    pub fn is_refused(&self) -> bool {
        matches!(self, Promotion::Rejected { .. } | Promotion::Taken { .. })
    }
}

/// Result of deleting a session from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub removed: ChatSession,
    /// Session that is active after the delete.
    pub active: ChatSession,
    /// Set when the store had to synthesize a session to stay non-empty.
    pub replacement_created: bool,
}

impl Deletion {
    /// Backend id to delete remotely, if the removed session ever got one.
    pub fn backend_id(&self) -> Option<&RemoteId> {
        self.removed.backend_id.as_ref()
    }
}
