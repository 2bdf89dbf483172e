//! JSON blob implementation of `SessionStorage`.

use crate::storage::KeyValueStore;
use async_trait::async_trait;
use innova_core::error::Result;
use innova_core::session::{ChatSession, SessionStorage};
use std::sync::Arc;

/// Key holding the serialized session array.
pub const CHATS_KEY: &str = "innovachat_chats";
/// Key holding the active session's local id.
pub const ACTIVE_CHAT_KEY: &str = "innovachat_active_chat";

/// Stores the whole session collection as one JSON array under [`CHATS_KEY`].
///
/// The layout matches what the browser client kept in local storage, so a
/// blob exported from there loads unchanged. An absent or unparsable blob
/// loads as an empty collection; the corruption is logged, never raised.
pub struct JsonSessionStorage {
    store: Arc<dyn KeyValueStore>,
    chats_key: String,
    active_key: String,
}

impl JsonSessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            chats_key: CHATS_KEY.to_string(),
            active_key: ACTIVE_CHAT_KEY.to_string(),
        }
    }

    /// Uses a different key prefix, e.g. one profile per backend.
    pub fn with_prefix(store: Arc<dyn KeyValueStore>, prefix: &str) -> Self {
        Self {
            store,
            chats_key: format!("{}_chats", prefix),
            active_key: format!("{}_active_chat", prefix),
        }
    }
}

#[async_trait]
impl SessionStorage for JsonSessionStorage {
    async fn load(&self) -> Vec<ChatSession> {
        let raw = match self.store.get(&self.chats_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(
                    "[JsonSessionStorage] Failed to read '{}', starting empty: {}",
                    self.chats_key,
                    e
                );
                return Vec::new();
            }
        };

        if raw.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<ChatSession>>(&raw) {
            Ok(sessions) => {
                tracing::debug!("[JsonSessionStorage] Loaded {} session(s)", sessions.len());
                sessions
            }
            Err(e) => {
                tracing::warn!(
                    "[JsonSessionStorage] Stored sessions under '{}' are corrupted, starting empty: {}",
                    self.chats_key,
                    e
                );
                Vec::new()
            }
        }
    }

    async fn save(&self, sessions: &[ChatSession]) -> Result<()> {
        let json = serde_json::to_string(sessions)?;
        self.store.set(&self.chats_key, &json).await
    }

    async fn load_active(&self) -> Option<String> {
        let raw = self.store.get(&self.active_key).await.ok().flatten()?;
        match serde_json::from_str::<String>(&raw) {
            Ok(id) if !id.is_empty() => Some(id),
            _ => None,
        }
    }

    async fn save_active(&self, local_id: Option<&str>) -> Result<()> {
        match local_id {
            Some(id) => {
                let json = serde_json::to_string(id)?;
                self.store.set(&self.active_key, &json).await
            }
            None => self.store.remove(&self.active_key).await,
        }
    }
}
