//! Session orchestration.
//!
//! This module provides:
//! - `SessionReconciler`: send state machine and chat intents
//! - `TitleGenerator`: one-shot title generation per session
//! - `SendLocks`: per-session serialization of sends

pub mod reconciler;
pub mod send_locks;
pub mod title_generator;

#[cfg(test)]
pub(crate) mod test_support;

pub use reconciler::{SendOutcome, SessionReconciler};
pub use send_locks::SendLocks;
pub use title_generator::TitleGenerator;
