use super::message::Message;
use super::model::{ChatSession, Deletion, Promotion, RemoteId, SessionPatch};
use super::repository::SessionStorage;
use crate::error::{InnovaError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct StoreState {
    /// Collection order: newest-created first.
    sessions: Vec<ChatSession>,
    active_id: Option<String>,
}

impl StoreState {
    fn position(&self, local_id: &str) -> Result<usize> {
        self.sessions
            .iter()
            .position(|s| s.local_id == local_id)
            .ok_or_else(|| InnovaError::not_found("ChatSession", local_id))
    }
}

/// The in-memory collection of chat sessions and the active selection.
///
/// `SessionStore` is responsible for:
/// - Creating, updating and deleting sessions
/// - Binding backend ids to sessions (one way, once)
/// - Keeping exactly one session active
/// - Persisting the full collection after every mutation
///
/// Every mutation works on a copy of the collection, persists the copy and
/// only then swaps it in, all under one lock. A failed persist leaves the
/// store exactly as it was.
pub struct SessionStore {
    state: Mutex<StoreState>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Loads the persisted sessions and resolves the active one.
    ///
    /// If storage holds no sessions, a new one is created and persisted so
    /// the collection is never empty. The previously active session is
    /// restored when it still exists, otherwise the most recently updated
    /// session becomes active.
    ///
    /// # Errors
    ///
    /// Returns an error if the bootstrap session or the active id cannot be persisted.
    pub async fn open(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let loaded = storage.load().await;
        let loaded_count = loaded.len();

        let mut seen = HashSet::new();
        let mut sessions: Vec<ChatSession> = loaded
            .into_iter()
            .filter(|s| seen.insert(s.local_id.clone()))
            .collect();
        if sessions.len() != loaded_count {
            tracing::warn!(
                "[SessionStore] Dropped {} session(s) with duplicate local ids",
                loaded_count - sessions.len()
            );
        }

        if sessions.is_empty() {
            let session = ChatSession::new();
            tracing::info!(
                "[SessionStore] No stored sessions, created {}",
                session.local_id
            );
            sessions.push(session);
            storage.save(&sessions).await?;
        }

        let stored_active = storage.load_active().await;
        let active_id = match stored_active
            .as_deref()
            .filter(|id| sessions.iter().any(|s| s.local_id == *id))
        {
            Some(id) => id.to_string(),
            None => {
                let id = sorted(&sessions)[0].local_id.clone();
                storage.save_active(Some(&id)).await?;
                id
            }
        };

        tracing::debug!(
            "[SessionStore] Opened with {} session(s), active={}",
            sessions.len(),
            active_id
        );

        Ok(Self {
            state: Mutex::new(StoreState {
                sessions,
                active_id: Some(active_id),
            }),
            storage,
        })
    }

    /// Creates a new empty session at the head of the collection.
    ///
    /// The new session is not selected; see [`SessionStore::select`].
    pub async fn create(&self) -> Result<ChatSession> {
        let mut state = self.state.lock().await;
        self.insert_new(&mut state).await
    }

    /// Creates a new empty session and makes it active in one step.
    ///
    /// Once the collection is persisted the new session is active, even if
    /// persisting the selection fails; see [`SessionStore::delete`].
    pub async fn create_selected(&self) -> Result<ChatSession> {
        let mut state = self.state.lock().await;
        let session = self.insert_new(&mut state).await?;
        self.activate(&mut state, &session.local_id).await;
        Ok(session)
    }

    pub async fn find(&self, local_id: &str) -> Option<ChatSession> {
        let state = self.state.lock().await;
        state
            .sessions
            .iter()
            .find(|s| s.local_id == local_id)
            .cloned()
    }

    /// Finds the session bound to a backend id.
    pub async fn find_by_backend_id(&self, backend_id: &RemoteId) -> Option<ChatSession> {
        let state = self.state.lock().await;
        state
            .sessions
            .iter()
            .find(|s| s.backend_id.as_ref() == Some(backend_id))
            .cloned()
    }

    /// All sessions, most recently updated first.
    ///
    /// Sessions with equal `updated_at` keep collection order.
    pub async fn list(&self) -> Vec<ChatSession> {
        let state = self.state.lock().await;
        sorted(&state.sessions)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.sessions.is_empty()
    }

    pub async fn active_id(&self) -> Option<String> {
        self.state.lock().await.active_id.clone()
    }

    pub async fn active(&self) -> Option<ChatSession> {
        let state = self.state.lock().await;
        let id = state.active_id.as_deref()?;
        state.sessions.iter().find(|s| s.local_id == id).cloned()
    }

    /// Makes `local_id` the active session and persists the selection.
    pub async fn select(&self, local_id: &str) -> Result<ChatSession> {
        let mut state = self.state.lock().await;
        let index = state.position(local_id)?;
        if state.active_id.as_deref() != Some(local_id) {
            self.storage.save_active(Some(local_id)).await?;
            state.active_id = Some(local_id.to_string());
        }
        Ok(state.sessions[index].clone())
    }

    /// Merges `patch` into a session and refreshes `updated_at`.
    ///
    /// A backend id in the patch is subject to the same guard as
    /// [`SessionStore::promote`]; a conflicting id fails the whole update.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no session has `local_id`
    /// - `Validation` if the patch carries a conflicting backend id
    pub async fn update(&self, local_id: &str, patch: SessionPatch) -> Result<ChatSession> {
        let mut state = self.state.lock().await;
        let index = state.position(local_id)?;

        if let Some(backend_id) = &patch.backend_id {
            match check_promotion(&state.sessions, index, backend_id) {
                Promotion::Rejected { existing } => {
                    return Err(InnovaError::validation(format!(
                        "session {} cannot take backend id {} (bound to {})",
                        local_id, backend_id, existing
                    )));
                }
                Promotion::Taken { holder } => {
                    return Err(InnovaError::validation(format!(
                        "session {} cannot take backend id {} (held by session {})",
                        local_id, backend_id, holder
                    )));
                }
                Promotion::Promoted | Promotion::Unchanged => {}
            }
        }

        let mut next = state.sessions.clone();
        let session = &mut next[index];
        if let Some(title) = patch.title {
            session.title = title;
        }
        if let Some(backend_id) = patch.backend_id {
            session.backend_id = Some(backend_id);
        }
        session.touch();
        let updated = session.clone();

        self.commit(&mut state, next).await?;
        Ok(updated)
    }

    /// Binds a backend id to a session that does not have one yet.
    ///
    /// The transition is one way: a session already bound to a different
    /// id, or an id already held by another session, is refused and nothing
    /// is persisted.
    pub async fn promote(&self, local_id: &str, backend_id: RemoteId) -> Result<Promotion> {
        let mut state = self.state.lock().await;
        let index = state.position(local_id)?;

        let outcome = check_promotion(&state.sessions, index, &backend_id);
        match &outcome {
            Promotion::Promoted => {
                let mut next = state.sessions.clone();
                next[index].backend_id = Some(backend_id.clone());
                next[index].touch();
                self.commit(&mut state, next).await?;
                tracing::info!(
                    "[SessionStore] Session {} promoted to backend id {}",
                    local_id,
                    backend_id
                );
            }
            Promotion::Unchanged => {}
            Promotion::Rejected { existing } => {
                tracing::warn!(
                    "[SessionStore] Ignoring backend id {} for session {} (already bound to {})",
                    backend_id,
                    local_id,
                    existing
                );
            }
            Promotion::Taken { holder } => {
                tracing::warn!(
                    "[SessionStore] Ignoring backend id {} for session {} (held by session {})",
                    backend_id,
                    local_id,
                    holder
                );
            }
        }
        Ok(outcome)
    }

    /// Sets a generated title, but only while the title is still the placeholder.
    ///
    /// Returns `false` without writing when the title was already replaced.
    pub async fn set_title_if_placeholder(&self, local_id: &str, title: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let index = state.position(local_id)?;
        if !state.sessions[index].has_placeholder_title() {
            return Ok(false);
        }

        let mut next = state.sessions.clone();
        next[index].title = title.to_string();
        next[index].touch();
        self.commit(&mut state, next).await?;
        Ok(true)
    }

    /// Removes a session.
    ///
    /// If the active session is removed, the most recently updated remaining
    /// session becomes active; if none remain, a new one is created. The
    /// returned [`Deletion`] carries the removed session so the caller can
    /// delete its backend counterpart.
    pub async fn delete(&self, local_id: &str) -> Result<Deletion> {
        let mut state = self.state.lock().await;
        let index = state.position(local_id)?;

        let mut next = state.sessions.clone();
        let removed = next.remove(index);
        let replacement_created = next.is_empty();
        if replacement_created {
            next.push(ChatSession::new());
        }

        let active_id = match state.active_id.as_deref() {
            Some(id) if id != local_id => id.to_string(),
            _ => sorted(&next)[0].local_id.clone(),
        };

        self.commit(&mut state, next).await?;
        self.activate(&mut state, &active_id).await;

        let active = state
            .sessions
            .iter()
            .find(|s| s.local_id == active_id)
            .cloned()
            .ok_or_else(|| InnovaError::internal("active session vanished during delete"))?;

        tracing::debug!(
            "[SessionStore] Deleted session {} (backend id: {:?}), active={}",
            removed.local_id,
            removed.backend_id,
            active.local_id
        );

        Ok(Deletion {
            removed,
            active,
            replacement_created,
        })
    }

    /// Appends a message and returns the session's resulting message list.
    pub async fn append_message(&self, local_id: &str, message: Message) -> Result<Vec<Message>> {
        let mut state = self.state.lock().await;
        let index = state.position(local_id)?;

        let mut next = state.sessions.clone();
        next[index].messages.push(message);
        next[index].touch();
        let messages = next[index].messages.clone();

        self.commit(&mut state, next).await?;
        Ok(messages)
    }

    /// Removes the most recent message. Only used to undo an optimistic append.
    pub async fn pop_last_message(&self, local_id: &str) -> Result<Option<Message>> {
        let mut state = self.state.lock().await;
        let index = state.position(local_id)?;
        if state.sessions[index].messages.is_empty() {
            return Ok(None);
        }

        let mut next = state.sessions.clone();
        let popped = next[index].messages.pop();
        next[index].touch();

        self.commit(&mut state, next).await?;
        Ok(popped)
    }

    async fn insert_new(&self, state: &mut StoreState) -> Result<ChatSession> {
        let session = ChatSession::new();

        let mut next = Vec::with_capacity(state.sessions.len() + 1);
        next.push(session.clone());
        next.extend(state.sessions.iter().cloned());
        self.commit(state, next).await?;

        tracing::debug!("[SessionStore] Created session {}", session.local_id);
        Ok(session)
    }

    /// Switches the in-memory selection, then persists it.
    ///
    /// Only called once the collection holding `local_id` is committed. A
    /// failed write is logged: a stale stored id is resolved again by
    /// [`SessionStore::open`], while a stale in-memory id would leave no
    /// session active.
    async fn activate(&self, state: &mut StoreState, local_id: &str) {
        if state.active_id.as_deref() == Some(local_id) {
            return;
        }
        state.active_id = Some(local_id.to_string());
        if let Err(e) = self.storage.save_active(Some(local_id)).await {
            tracing::warn!(
                "[SessionStore] Failed to persist active session {}: {}",
                local_id,
                e
            );
        }
    }

    async fn commit(&self, state: &mut StoreState, next: Vec<ChatSession>) -> Result<()> {
        self.storage.save(&next).await?;
        state.sessions = next;
        Ok(())
    }
}

fn sorted(sessions: &[ChatSession]) -> Vec<ChatSession> {
    let mut list = sessions.to_vec();
    // sort_by is stable, ties keep collection order
    list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    list
}

fn check_promotion(sessions: &[ChatSession], index: usize, backend_id: &RemoteId) -> Promotion {
    if let Some(existing) = &sessions[index].backend_id {
        return if existing == backend_id {
            Promotion::Unchanged
        } else {
            Promotion::Rejected {
                existing: existing.clone(),
            }
        };
    }
    let holder = sessions
        .iter()
        .enumerate()
        .find(|(i, s)| *i != index && s.backend_id.as_ref() == Some(backend_id));
    match holder {
        Some((_, holder)) => Promotion::Taken {
            holder: holder.local_id.clone(),
        },
        None => Promotion::Promoted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Sender, NEW_CHAT_TITLE};
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // In-memory SessionStorage for testing
    #[derive(Default)]
    struct MockStorage {
        sessions: std::sync::Mutex<Vec<ChatSession>>,
        active: std::sync::Mutex<Option<String>>,
        saves: AtomicUsize,
        fail_saves: AtomicBool,
        fail_active_saves: AtomicBool,
    }

    impl MockStorage {
        fn with_sessions(sessions: Vec<ChatSession>) -> Self {
            Self {
                sessions: std::sync::Mutex::new(sessions),
                ..Self::default()
            }
        }

        fn persisted(&self) -> Vec<ChatSession> {
            self.sessions.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SessionStorage for MockStorage {
        async fn load(&self) -> Vec<ChatSession> {
            self.sessions.lock().unwrap().clone()
        }

        async fn save(&self, sessions: &[ChatSession]) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(InnovaError::storage("disk full"));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.sessions.lock().unwrap() = sessions.to_vec();
            Ok(())
        }

        async fn load_active(&self) -> Option<String> {
            self.active.lock().unwrap().clone()
        }

        async fn save_active(&self, local_id: Option<&str>) -> Result<()> {
            if self.fail_active_saves.load(Ordering::SeqCst) {
                return Err(InnovaError::storage("read-only"));
            }
            *self.active.lock().unwrap() = local_id.map(str::to_string);
            Ok(())
        }
    }

    fn session_at(title: &str, offset_secs: i64) -> ChatSession {
        let mut session = ChatSession::new();
        let ts = Utc::now() - Duration::hours(1) + Duration::seconds(offset_secs);
        session.title = title.to_string();
        session.created_at = ts;
        session.updated_at = ts;
        session
    }

    async fn open(storage: &Arc<MockStorage>) -> SessionStore {
        SessionStore::open(storage.clone()).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_empty_storage_bootstraps_one_session() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;

        let sessions = store.list().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, NEW_CHAT_TITLE);
        assert!(sessions[0].messages.is_empty());
        assert_eq!(store.active_id().await, Some(sessions[0].local_id.clone()));
        assert_eq!(storage.persisted().len(), 1);
        assert_eq!(
            *storage.active.lock().unwrap(),
            Some(sessions[0].local_id.clone())
        );
    }

    #[tokio::test]
    async fn test_open_restores_stored_active_session() {
        let older = session_at("older", 0);
        let newer = session_at("newer", 10);
        let storage = Arc::new(MockStorage::with_sessions(vec![newer.clone(), older.clone()]));
        *storage.active.lock().unwrap() = Some(older.local_id.clone());

        let store = open(&storage).await;
        assert_eq!(store.active().await.unwrap().local_id, older.local_id);
    }

    #[tokio::test]
    async fn test_open_falls_back_to_most_recent_when_active_is_stale() {
        let older = session_at("older", 0);
        let newer = session_at("newer", 10);
        let storage = Arc::new(MockStorage::with_sessions(vec![older.clone(), newer.clone()]));
        *storage.active.lock().unwrap() = Some("gone".to_string());

        let store = open(&storage).await;
        assert_eq!(store.active_id().await, Some(newer.local_id.clone()));
        assert_eq!(*storage.active.lock().unwrap(), Some(newer.local_id));
    }

    #[tokio::test]
    async fn test_open_drops_duplicate_local_ids() {
        let first = session_at("first", 0);
        let mut dup = session_at("dup", 5);
        dup.local_id = first.local_id.clone();
        let storage = Arc::new(MockStorage::with_sessions(vec![first.clone(), dup]));

        let store = open(&storage).await;
        let sessions = store.list().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "first");
    }

    #[tokio::test]
    async fn test_create_inserts_at_head_and_persists() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let first = store.active().await.unwrap();

        let created = store.create().await.unwrap();
        assert_ne!(created.local_id, first.local_id);
        assert_eq!(created.title, NEW_CHAT_TITLE);

        let persisted = storage.persisted();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].local_id, created.local_id);
        // create does not change the selection
        assert_eq!(store.active_id().await, Some(first.local_id));
    }

    #[tokio::test]
    async fn test_local_ids_unique_across_create_delete_sequences() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;

        for round in 0..5 {
            let created = store.create().await.unwrap();
            store.create().await.unwrap();
            if round % 2 == 0 {
                store.delete(&created.local_id).await.unwrap();
            }
        }

        let sessions = store.list().await;
        let ids: HashSet<_> = sessions.iter().map(|s| s.local_id.clone()).collect();
        assert_eq!(ids.len(), sessions.len());
    }

    #[tokio::test]
    async fn test_list_sorted_by_updated_at_desc_stable_on_ties() {
        let a = session_at("a", 0);
        let mut b = session_at("b", 0);
        b.updated_at = a.updated_at;
        let c = session_at("c", 30);
        let mut d = session_at("d", 0);
        d.updated_at = a.updated_at;
        let storage = Arc::new(MockStorage::with_sessions(vec![
            a.clone(),
            b.clone(),
            c.clone(),
            d.clone(),
        ]));
        let store = open(&storage).await;

        let titles: Vec<String> = store.list().await.into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["c", "a", "b", "d"]);
    }

    #[tokio::test]
    async fn test_append_message_moves_session_to_top() {
        let older = session_at("older", 0);
        let newer = session_at("newer", 10);
        let storage = Arc::new(MockStorage::with_sessions(vec![newer.clone(), older.clone()]));
        let store = open(&storage).await;

        let messages = store
            .append_message(&older.local_id, Message::user("Hello"))
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::User);

        let list = store.list().await;
        assert_eq!(list[0].local_id, older.local_id);
        assert!(list[0].updated_at > older.updated_at);
        let persisted = storage.persisted();
        let stored = persisted
            .iter()
            .find(|s| s.local_id == older.local_id)
            .unwrap();
        assert_eq!(stored.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_pop_last_message() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let id = store.active_id().await.unwrap();

        assert_eq!(store.pop_last_message(&id).await.unwrap(), None);

        store.append_message(&id, Message::user("one")).await.unwrap();
        store.append_message(&id, Message::user("two")).await.unwrap();
        let popped = store.pop_last_message(&id).await.unwrap().unwrap();
        assert_eq!(popped.content, "two");

        let session = store.find(&id).await.unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "one");
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let id = store.active_id().await.unwrap();
        let before = store.find(&id).await.unwrap();

        let updated = store
            .update(
                &id,
                SessionPatch {
                    title: Some("Rust questions".to_string()),
                    backend_id: Some(RemoteId::Number(3)),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Rust questions");
        assert_eq!(updated.backend_id, Some(RemoteId::Number(3)));
        assert!(updated.updated_at >= before.updated_at);
        assert_eq!(storage.persisted()[0].title, "Rust questions");
    }

    #[tokio::test]
    async fn test_update_unknown_session_is_not_found() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let err = store
            .update("missing", SessionPatch::title("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_rejects_conflicting_backend_id() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let id = store.active_id().await.unwrap();
        store.promote(&id, RemoteId::Number(7)).await.unwrap();

        let err = store
            .update(&id, SessionPatch::backend_id(RemoteId::Number(8)))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            store.find(&id).await.unwrap().backend_id,
            Some(RemoteId::Number(7))
        );
    }

    #[tokio::test]
    async fn test_promote_is_one_way() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let id = store.active_id().await.unwrap();

        assert_eq!(
            store.promote(&id, RemoteId::Number(42)).await.unwrap(),
            Promotion::Promoted
        );
        assert_eq!(
            store.promote(&id, RemoteId::Number(42)).await.unwrap(),
            Promotion::Unchanged
        );
        assert_eq!(
            store.promote(&id, RemoteId::Number(43)).await.unwrap(),
            Promotion::Rejected {
                existing: RemoteId::Number(42)
            }
        );
        assert_eq!(
            store.find(&id).await.unwrap().backend_id,
            Some(RemoteId::Number(42))
        );
    }

    #[tokio::test]
    async fn test_promote_rejects_id_held_by_another_session() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let first = store.active_id().await.unwrap();
        let second = store.create().await.unwrap();

        store.promote(&first, RemoteId::Number(1)).await.unwrap();
        let outcome = store
            .promote(&second.local_id, RemoteId::Number(1))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Promotion::Taken {
                holder: first.clone()
            }
        );
        assert!(outcome.is_refused());
        assert!(store.find(&second.local_id).await.unwrap().backend_id.is_none());
        assert_eq!(
            store
                .find_by_backend_id(&RemoteId::Number(1))
                .await
                .unwrap()
                .local_id,
            first
        );
    }

    #[tokio::test]
    async fn test_set_title_if_placeholder() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let id = store.active_id().await.unwrap();

        assert!(store.set_title_if_placeholder(&id, "First").await.unwrap());
        assert!(!store.set_title_if_placeholder(&id, "Second").await.unwrap());
        assert_eq!(store.find(&id).await.unwrap().title, "First");
    }

    #[tokio::test]
    async fn test_delete_reports_backend_id_and_reselects() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let first = store.active_id().await.unwrap();
        let second = store.create().await.unwrap();
        store.promote(&first, RemoteId::Number(9)).await.unwrap();

        let deletion = store.delete(&first).await.unwrap();
        assert_eq!(deletion.backend_id(), Some(&RemoteId::Number(9)));
        assert!(!deletion.replacement_created);
        assert_eq!(deletion.active.local_id, second.local_id);
        assert_eq!(store.active_id().await, Some(second.local_id.clone()));
        assert_eq!(storage.persisted().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_inactive_session_keeps_selection() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let first = store.active_id().await.unwrap();
        let second = store.create().await.unwrap();

        let deletion = store.delete(&second.local_id).await.unwrap();
        assert!(deletion.backend_id().is_none());
        assert_eq!(deletion.active.local_id, first);
    }

    #[tokio::test]
    async fn test_delete_last_session_synthesizes_replacement() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let only = store.active_id().await.unwrap();

        let deletion = store.delete(&only).await.unwrap();
        assert!(deletion.replacement_created);
        assert_ne!(deletion.active.local_id, only);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.active_id().await, Some(deletion.active.local_id));
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_store_unchanged() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let id = store.active_id().await.unwrap();
        store.append_message(&id, Message::user("kept")).await.unwrap();

        storage.fail_saves.store(true, Ordering::SeqCst);
        let err = store
            .append_message(&id, Message::user("lost"))
            .await
            .unwrap_err();
        assert!(err.is_storage());
        assert!(store.create().await.is_err());

        let session = store.find(&id).await.unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_every_mutation_persists() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let id = store.active_id().await.unwrap();
        let baseline = storage.saves.load(Ordering::SeqCst);

        store.append_message(&id, Message::user("a")).await.unwrap();
        store.update(&id, SessionPatch::title("t")).await.unwrap();
        store.promote(&id, RemoteId::Number(1)).await.unwrap();
        store.pop_last_message(&id).await.unwrap();
        store.create().await.unwrap();

        assert_eq!(storage.saves.load(Ordering::SeqCst) - baseline, 5);
    }

    #[tokio::test]
    async fn test_delete_active_keeps_a_selection_when_active_write_fails() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let first = store.active_id().await.unwrap();
        let second = store.create().await.unwrap();

        storage.fail_active_saves.store(true, Ordering::SeqCst);
        let deletion = store.delete(&first).await.unwrap();

        assert!(store.find(&first).await.is_none());
        assert_eq!(deletion.active.local_id, second.local_id);
        let active = store.active().await.expect("a session must stay active");
        assert_eq!(active.local_id, second.local_id);
        // The stored selection is stale but still resolves on reopen
        assert_eq!(*storage.active.lock().unwrap(), Some(first));

        storage.fail_active_saves.store(false, Ordering::SeqCst);
        let reopened = open(&storage).await;
        assert_eq!(reopened.active_id().await, Some(second.local_id));
    }

    #[tokio::test]
    async fn test_create_selected_selects_even_when_active_write_fails() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let first = store.active_id().await.unwrap();

        storage.fail_active_saves.store(true, Ordering::SeqCst);
        let created = store.create_selected().await.unwrap();

        assert_eq!(store.active_id().await, Some(created.local_id.clone()));
        assert_eq!(storage.persisted()[0].local_id, created.local_id);
        assert_eq!(*storage.active.lock().unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_create_selected_failed_persist_changes_nothing() {
        let storage = Arc::new(MockStorage::default());
        let store = open(&storage).await;
        let first = store.active_id().await.unwrap();

        storage.fail_saves.store(true, Ordering::SeqCst);
        assert!(store.create_selected().await.is_err());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.active_id().await, Some(first));
    }
}
