//! Session reconciler: the send state machine and the chat-level intents.
//!
//! A send moves through `Idle -> Sending -> {Settled, Failed}`. The user
//! message is appended optimistically before the transport call; a failed
//! call rolls it back and leaves a visible error message in its place.

use super::send_locks::SendLocks;
use super::title_generator::TitleGenerator;
use innova_core::error::{InnovaError, Result, TransportError};
use innova_core::session::{ChatSession, Deletion, Message, SessionStore};
use innova_core::transport::ChatTransport;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Result of a send that reached the transport.
///
/// Transport failures are an expected outcome, not an error: they are
/// already reflected in the session as a synthetic bot message.
#[derive(Debug)]
pub enum SendOutcome {
    Settled {
        session: ChatSession,
        bot_message: Message,
        /// Background title generation started by this send, if any.
        title_task: Option<JoinHandle<()>>,
    },
    Failed {
        session: ChatSession,
        error: TransportError,
    },
}

impl SendOutcome {
    pub fn session(&self) -> &ChatSession {
        match self {
            SendOutcome::Settled { session, .. } | SendOutcome::Failed { session, .. } => session,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, SendOutcome::Settled { .. })
    }

    /// Waits for the title task started by this send, if there is one.
    pub async fn wait_for_title(&mut self) {
        if let SendOutcome::Settled { title_task, .. } = self {
            if let Some(handle) = title_task.take() {
                if let Err(e) = handle.await {
                    tracing::warn!("[SessionReconciler] Title task did not finish: {}", e);
                }
            }
        }
    }
}

/// Orchestrates the session store and the transport for user intents.
pub struct SessionReconciler {
    store: Arc<SessionStore>,
    transport: Arc<dyn ChatTransport>,
    titles: TitleGenerator,
    send_locks: SendLocks,
}

impl SessionReconciler {
    pub fn new(store: Arc<SessionStore>, transport: Arc<dyn ChatTransport>) -> Self {
        let titles = TitleGenerator::new(store.clone(), transport.clone());
        Self {
            store,
            transport,
            titles,
            send_locks: SendLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn titles(&self) -> &TitleGenerator {
        &self.titles
    }

    pub async fn active_session(&self) -> Option<ChatSession> {
        self.store.active().await
    }

    /// Sessions for the sidebar, most recently updated first.
    pub async fn sessions(&self) -> Vec<ChatSession> {
        self.store.list().await
    }

    /// Sends `text` on the active session.
    ///
    /// # Errors
    ///
    /// - `Validation` if the text is blank or no session is active
    /// - storage errors from the session store
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome> {
        let local_id = self
            .store
            .active_id()
            .await
            .ok_or_else(|| InnovaError::validation("No active chat session"))?;
        self.send_message_to(&local_id, text).await
    }

    /// Sends `text` on the session `local_id`.
    pub async fn send_message_to(&self, local_id: &str, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InnovaError::validation("Message cannot be empty"));
        }
        if self.store.find(local_id).await.is_none() {
            return Err(InnovaError::validation(format!(
                "Chat session {} does not exist",
                local_id
            )));
        }

        let _guard = self.send_locks.acquire(local_id).await;

        // Re-read under the lock: an earlier send may have promoted the session
        let session = self
            .store
            .find(local_id)
            .await
            .ok_or_else(|| InnovaError::not_found("ChatSession", local_id))?;

        self.store.append_message(local_id, Message::user(text)).await?;
        tracing::debug!(
            "[SessionReconciler] Sending on session {} (backend id: {:?})",
            local_id,
            session.backend_id
        );

        match self
            .transport
            .send_chat_message(text, session.backend_id.as_ref())
            .await
        {
            Ok(reply) => {
                // A stale reply carrying a different id is refused by the store
                if let Some(backend_id) = reply.backend_session_id {
                    match self.store.promote(local_id, backend_id).await {
                        Ok(outcome) if outcome.is_refused() => tracing::debug!(
                            "[SessionReconciler] Kept existing backend id for session {}",
                            local_id
                        ),
                        Ok(_) => {}
                        Err(e) => return Err(self.roll_back_user_message(local_id, e).await),
                    }
                }

                let messages = match self
                    .store
                    .append_message(local_id, reply.bot_message.clone())
                    .await
                {
                    Ok(messages) => messages,
                    Err(e) => return Err(self.roll_back_user_message(local_id, e).await),
                };

                // The exchange is stored from here on; title failures only cost the title
                let mut title_task = None;
                if let Some(title) = reply.generated_title.as_deref() {
                    match self.store.set_title_if_placeholder(local_id, title).await {
                        Ok(true) => {
                            self.titles.claim(local_id);
                            tracing::info!(
                                "[SessionReconciler] Session {} titled by reply: {:?}",
                                local_id,
                                title
                            );
                        }
                        Ok(false) => {}
                        Err(e) => tracing::warn!(
                            "[SessionReconciler] Failed to store title for session {}: {}",
                            local_id,
                            e
                        ),
                    }
                }

                let session = self
                    .store
                    .find(local_id)
                    .await
                    .ok_or_else(|| InnovaError::not_found("ChatSession", local_id))?;
                if session.has_placeholder_title()
                    && messages.len() >= 2
                    && self.titles.claim(local_id)
                {
                    title_task = Some(self.titles.spawn(local_id.to_string()));
                }

                Ok(SendOutcome::Settled {
                    session,
                    bot_message: reply.bot_message,
                    title_task,
                })
            }
            Err(error) => {
                tracing::warn!(
                    "[SessionReconciler] Send on session {} failed: {}",
                    local_id,
                    error
                );
                // If the pop fails the store is unchanged and still holds the user message
                self.store.pop_last_message(local_id).await?;
                self.store
                    .append_message(local_id, Message::error_notice(error.user_message()))
                    .await?;

                let session = self
                    .store
                    .find(local_id)
                    .await
                    .ok_or_else(|| InnovaError::not_found("ChatSession", local_id))?;
                Ok(SendOutcome::Failed { session, error })
            }
        }
    }

    /// Removes the optimistic user message after a store failure and
    /// hands back the original error.
    async fn roll_back_user_message(&self, local_id: &str, error: InnovaError) -> InnovaError {
        tracing::warn!(
            "[SessionReconciler] Storing the reply for session {} failed, rolling back: {}",
            local_id,
            error
        );
        if let Err(e) = self.store.pop_last_message(local_id).await {
            tracing::error!(
                "[SessionReconciler] Rollback for session {} failed: {}",
                local_id,
                e
            );
        }
        error
    }

    /// Creates a new chat and makes it active.
    pub async fn new_chat(&self) -> Result<ChatSession> {
        self.store.create_selected().await
    }

    pub async fn select_chat(&self, local_id: &str) -> Result<ChatSession> {
        self.store.select(local_id).await
    }

    /// Deletes a chat locally, then best-effort on the backend.
    ///
    /// A failed remote delete is logged; the local deletion stands.
    pub async fn delete_chat(&self, local_id: &str) -> Result<Deletion> {
        let deletion = self.store.delete(local_id).await?;
        self.send_locks.forget(local_id).await;
        self.titles.release(local_id);

        if let Some(backend_id) = deletion.backend_id() {
            match self.transport.delete_remote_session(backend_id).await {
                Ok(()) => tracing::debug!(
                    "[SessionReconciler] Deleted backend session {}",
                    backend_id
                ),
                Err(e) => tracing::warn!(
                    "[SessionReconciler] Failed to delete backend session {}: {}",
                    backend_id,
                    e
                ),
            }
        }
        Ok(deletion)
    }

    /// Fills an empty promoted session with its history from the backend.
    ///
    /// Returns the number of restored messages. Sessions that already hold
    /// messages or were never promoted are left alone.
    pub async fn restore_history(&self, local_id: &str) -> Result<usize> {
        let _guard = self.send_locks.acquire(local_id).await;

        let session = self
            .store
            .find(local_id)
            .await
            .ok_or_else(|| InnovaError::not_found("ChatSession", local_id))?;
        let Some(backend_id) = session.backend_id.as_ref() else {
            return Ok(0);
        };
        if !session.messages.is_empty() {
            return Ok(0);
        }

        let history = self.transport.fetch_messages(backend_id).await?;
        let count = history.len();
        for message in history {
            self.store.append_message(local_id, message).await?;
        }
        tracing::info!(
            "[SessionReconciler] Restored {} message(s) for session {}",
            count,
            local_id
        );
        Ok(count)
    }
}
