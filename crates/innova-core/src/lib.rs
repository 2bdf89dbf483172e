//! Domain layer for InnovaChat.
//!
//! Holds the chat session model, the [`session::SessionStore`] that owns the
//! session collection, and the storage and transport interfaces the outer
//! crates implement.

pub mod error;
pub mod session;
pub mod transport;

// Re-export common error types
pub use error::{InnovaError, Result, TransportError};
pub use session::{ChatSession, Message, RemoteId, Sender, SessionStore};
pub use transport::{ChatReply, ChatTransport};
