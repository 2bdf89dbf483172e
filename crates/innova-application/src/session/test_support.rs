//! Scripted collaborators shared by the application tests.

use async_trait::async_trait;
use innova_core::error::{InnovaError, Result, TransportError};
use innova_core::session::{ChatSession, Message, RemoteId, SessionStorage, SessionStore};
use innova_core::transport::{ChatReply, ChatTransport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
pub struct MemoryStorage {
    sessions: Mutex<Vec<ChatSession>>,
    active: Mutex<Option<String>>,
    failing_saves: AtomicUsize,
}

impl MemoryStorage {
    /// Makes the next `count` collection writes fail.
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Vec<ChatSession> {
        self.sessions.lock().unwrap().clone()
    }

    async fn save(&self, sessions: &[ChatSession]) -> Result<()> {
        let failing = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(InnovaError::storage("disk full"));
        }
        *self.sessions.lock().unwrap() = sessions.to_vec();
        Ok(())
    }

    async fn load_active(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }

    async fn save_active(&self, local_id: Option<&str>) -> Result<()> {
        *self.active.lock().unwrap() = local_id.map(str::to_string);
        Ok(())
    }
}

pub async fn memory_store() -> Arc<SessionStore> {
    store_on(Arc::new(MemoryStorage::default())).await
}

pub async fn store_on(storage: Arc<MemoryStorage>) -> Arc<SessionStore> {
    Arc::new(SessionStore::open(storage).await.unwrap())
}

/// Builds the reply the service sends for a first exchange.
pub fn reply(session_id: Option<i64>, content: &str, message_id: i64) -> ChatReply {
    ChatReply {
        backend_session_id: session_id.map(RemoteId::Number),
        bot_message: Message::bot(content).with_id(RemoteId::Number(message_id)),
        generated_title: None,
    }
}

/// A transport that replays queued results and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    chat_replies: Mutex<VecDeque<std::result::Result<ChatReply, TransportError>>>,
    title_replies: Mutex<VecDeque<std::result::Result<String, TransportError>>>,
    history: Mutex<Option<std::result::Result<Vec<Message>, TransportError>>>,
    delete_result: Mutex<Option<TransportError>>,
    pub chat_calls: Mutex<Vec<(String, Option<RemoteId>)>>,
    pub title_calls: Mutex<Vec<RemoteId>>,
    pub delete_calls: Mutex<Vec<RemoteId>>,
    pub fetch_calls: Mutex<Vec<RemoteId>>,
    /// When set, the first chat call waits for a notification before replying.
    pub first_chat_gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            first_chat_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_chat(self, result: std::result::Result<ChatReply, TransportError>) -> Self {
        self.chat_replies.lock().unwrap().push_back(result);
        self
    }

    pub fn push_title(self, result: std::result::Result<String, TransportError>) -> Self {
        self.title_replies.lock().unwrap().push_back(result);
        self
    }

    pub fn with_history(self, result: std::result::Result<Vec<Message>, TransportError>) -> Self {
        *self.history.lock().unwrap() = Some(result);
        self
    }

    pub fn failing_delete(self, error: TransportError) -> Self {
        *self.delete_result.lock().unwrap() = Some(error);
        self
    }

    pub fn chat_call_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_chat_message(
        &self,
        text: &str,
        backend_session_id: Option<&RemoteId>,
    ) -> std::result::Result<ChatReply, TransportError> {
        let call_index = {
            let mut calls = self.chat_calls.lock().unwrap();
            calls.push((text.to_string(), backend_session_id.cloned()));
            calls.len() - 1
        };
        if call_index == 0 {
            if let Some(gate) = &self.first_chat_gate {
                gate.notified().await;
            }
        }
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("no scripted reply")))
    }

    async fn request_title(
        &self,
        backend_session_id: &RemoteId,
    ) -> std::result::Result<String, TransportError> {
        self.title_calls
            .lock()
            .unwrap()
            .push(backend_session_id.clone());
        self.title_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("no scripted title")))
    }

    async fn delete_remote_session(
        &self,
        backend_session_id: &RemoteId,
    ) -> std::result::Result<(), TransportError> {
        self.delete_calls
            .lock()
            .unwrap()
            .push(backend_session_id.clone());
        match self.delete_result.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_messages(
        &self,
        backend_session_id: &RemoteId,
    ) -> std::result::Result<Vec<Message>, TransportError> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push(backend_session_id.clone());
        self.history
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
