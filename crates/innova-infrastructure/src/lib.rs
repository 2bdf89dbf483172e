//! Infrastructure layer for InnovaChat.
//!
//! Key-value substrates, the JSON session storage built on them, path
//! resolution and client configuration.

pub mod config_service;
pub mod json_session_storage;
pub mod paths;
pub mod storage;

pub use crate::config_service::ClientConfig;
pub use crate::json_session_storage::JsonSessionStorage;
pub use crate::paths::InnovaPaths;
pub use crate::storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
