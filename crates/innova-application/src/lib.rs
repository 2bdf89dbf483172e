//! Application layer for InnovaChat.
//!
//! This crate coordinates the session store and the chat transport to
//! implement user intents: sending messages, switching, creating and
//! deleting chats, and titling new conversations.

pub mod session;

pub use session::{SendOutcome, SessionReconciler, TitleGenerator};
