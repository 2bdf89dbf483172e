use innova_core::error::Result;
use innova_core::session::{fallback_title_for, SessionStore};
use innova_core::transport::ChatTransport;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Replaces the "New Chat" placeholder with a real title after the first exchange.
///
/// Each session gets at most one generation attempt per run. The backend is
/// asked first; when the session has no backend id or the request fails, the
/// title is derived from the first user message instead.
#[derive(Clone)]
pub struct TitleGenerator {
    store: Arc<SessionStore>,
    transport: Arc<dyn ChatTransport>,
    claimed: Arc<Mutex<HashSet<String>>>,
}

impl TitleGenerator {
    pub fn new(store: Arc<SessionStore>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            store,
            transport,
            claimed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Marks `local_id` as having had its title attempt.
    ///
    /// Returns `false` if an attempt was already claimed.
    pub fn claim(&self, local_id: &str) -> bool {
        self.claimed_set().insert(local_id.to_string())
    }

    pub fn is_claimed(&self, local_id: &str) -> bool {
        self.claimed_set().contains(local_id)
    }

    /// Forgets the claim of a deleted session.
    pub fn release(&self, local_id: &str) {
        self.claimed_set().remove(local_id);
    }

    /// Runs [`TitleGenerator::generate`] in the background.
    ///
    /// Failures are logged; the session simply keeps its placeholder.
    pub fn spawn(&self, local_id: String) -> JoinHandle<()> {
        let generator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = generator.generate(&local_id).await {
                tracing::warn!(
                    "[TitleGenerator] Failed to set title for session {}: {}",
                    local_id,
                    e
                );
            }
        })
    }

    /// Generates and applies a title for `local_id`.
    ///
    /// Returns the applied title, or `None` when the session is gone or its
    /// title was replaced in the meantime.
    pub async fn generate(&self, local_id: &str) -> Result<Option<String>> {
        let Some(session) = self.store.find(local_id).await else {
            tracing::debug!("[TitleGenerator] Session {} no longer exists", local_id);
            return Ok(None);
        };
        if !session.has_placeholder_title() {
            return Ok(None);
        }

        let title = match &session.backend_id {
            Some(backend_id) => match self.transport.request_title(backend_id).await {
                Ok(title) => title,
                Err(e) => {
                    tracing::warn!(
                        "[TitleGenerator] Backend title for session {} failed, using fallback: {}",
                        local_id,
                        e
                    );
                    fallback_title_for(&session)
                }
            },
            None => fallback_title_for(&session),
        };

        // The session may have been deleted while the request was in flight
        if self.store.find(local_id).await.is_none() {
            return Ok(None);
        }
        if self.store.set_title_if_placeholder(local_id, &title).await? {
            tracing::info!("[TitleGenerator] Session {} titled {:?}", local_id, title);
            Ok(Some(title))
        } else {
            Ok(None)
        }
    }

    fn claimed_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
