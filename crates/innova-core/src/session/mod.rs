//! Session domain module.
//!
//! This module contains the chat session model, the storage interface the
//! store persists through, and the [`SessionStore`] itself.
//!
//! # Module Structure
//!
//! - `model`: `ChatSession`, `RemoteId`, `SessionPatch` and operation outcomes
//! - `message`: `Message` and `Sender`
//! - `repository`: `SessionStorage` trait
//! - `store`: `SessionStore`, the in-memory collection with persist-on-mutate
//! - `title`: fallback title derivation
//!
//! # Usage
//!
//! ```ignore
//! use innova_core::session::{ChatSession, Message, SessionStore, SessionStorage};
//! ```

mod message;
mod model;
mod repository;
mod store;
mod title;

// Re-export public API
pub use message::{parse_remote_timestamp, Message, Sender};
pub use model::{ChatSession, Deletion, Promotion, RemoteId, SessionPatch, NEW_CHAT_TITLE};
pub use repository::SessionStorage;
pub use store::SessionStore;
pub use title::{fallback_title, fallback_title_for, FALLBACK_TITLE_WORDS};
