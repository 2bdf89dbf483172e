//! Remote service clients for InnovaChat.
//!
//! [`HttpChatTransport`] implements [`innova_core::ChatTransport`] over the
//! service's JSON HTTP API.

pub mod http_chat_transport;

pub use http_chat_transport::HttpChatTransport;
