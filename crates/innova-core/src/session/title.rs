//! Client-side title derivation.

use super::model::{ChatSession, NEW_CHAT_TITLE};

/// Number of words kept from the first user message.
pub const FALLBACK_TITLE_WORDS: usize = 5;

/// Derives a title from the first words of `text`, followed by `...`.
///
/// Blank input yields the placeholder title.
pub fn fallback_title(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().take(FALLBACK_TITLE_WORDS).collect();
    if words.is_empty() {
        return NEW_CHAT_TITLE.to_string();
    }
    format!("{}...", words.join(" "))
}

/// Fallback title for a session, based on its first user message.
pub fn fallback_title_for(session: &ChatSession) -> String {
    session
        .first_user_message()
        .map(|m| fallback_title(&m.content))
        .unwrap_or_else(|| NEW_CHAT_TITLE.to_string())
}
