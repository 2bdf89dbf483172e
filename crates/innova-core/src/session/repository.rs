//! Session storage trait.
//!
//! Defines the interface the [`SessionStore`](super::SessionStore) persists through.

use super::model::ChatSession;
use crate::error::Result;
use async_trait::async_trait;

/// Persists the whole session collection as one unit.
///
/// The collection is always written in full, never per session, so a
/// reader sees either the previous or the next collection and nothing in
/// between.
///
/// # Implementation Notes
///
/// - `load` must not fail: a missing or unreadable blob is "no prior state".
/// - `save` must be atomic from the caller's perspective.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Loads the persisted collection, or an empty one if none is usable.
    async fn load(&self) -> Vec<ChatSession>;

    /// Replaces the persisted collection.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the collection is durable
    /// - `Err(_)`: nothing was written
    async fn save(&self, sessions: &[ChatSession]) -> Result<()>;

    /// Loads the local id of the session that was active last time.
    async fn load_active(&self) -> Option<String>;

    /// Persists the active session's local id (`None` clears it).
    async fn save_active(&self, local_id: Option<&str>) -> Result<()>;
}
