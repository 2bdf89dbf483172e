//! Conversation message types.

use super::model::RemoteId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Plain text typed by the user.
    User,
    /// Markdown produced by the remote service, or a synthetic error notice.
    Bot,
}

/// A single message in a chat thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Server-assigned identifier, absent until the service acknowledges the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
}

impl Message {
    /// A user message stamped with the current client time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            timestamp: Utc::now(),
            id: None,
        }
    }

    /// A bot message stamped with the current client time.
    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: content.into(),
            timestamp: Utc::now(),
            id: None,
        }
    }

    /// The synthetic bot message shown in place of a failed reply.
    pub fn error_notice(detail: impl AsRef<str>) -> Self {
        Self::bot(format!("Error: {}", detail.as_ref()))
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_id(mut self, id: RemoteId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Parses a timestamp reported by the service.
///
/// Accepts RFC 3339 with any offset (`2025-06-09T01:30:00.000+00:00`, `...Z`)
/// and the naive `YYYY-MM-DD HH:MM:SS` form SQLite writes, read as UTC.
pub fn parse_remote_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
