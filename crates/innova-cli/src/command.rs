use innova_core::session::ChatSession;

pub const COMMAND_NAMES: &[&str] = &[
    "/new", "/list", "/switch", "/delete", "/history", "/help", "/quit",
];

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    List,
    Switch(String),
    /// `None` deletes the active chat.
    Delete(Option<String>),
    History,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    /// Parses a trimmed, non-empty input line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if !line.starts_with('/') {
            return Command::Send(line.to_string());
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };

        match (name, arg) {
            ("/new", _) => Command::New,
            ("/list", _) => Command::List,
            ("/switch", Some(target)) => Command::Switch(target.to_string()),
            ("/delete", target) => Command::Delete(target.map(str::to_string)),
            ("/history", _) => Command::History,
            ("/help", _) => Command::Help,
            ("/quit" | "/exit", _) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Resolves a `/switch` or `/delete` argument against the listed sessions.
///
/// Accepts a 1-based position in the list, or a local id (or a unique
/// prefix of one).
pub fn resolve_target<'a>(sessions: &'a [ChatSession], target: &str) -> Option<&'a ChatSession> {
    if let Ok(n) = target.parse::<usize>() {
        if n >= 1 {
            if let Some(session) = sessions.get(n - 1) {
                return Some(session);
            }
        }
    }

    if let Some(exact) = sessions.iter().find(|s| s.local_id == target) {
        return Some(exact);
    }
    let mut matches = sessions.iter().filter(|s| s.local_id.starts_with(target));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

pub fn help_text() -> &'static str {
    "Type a message to chat. Commands:\n  \
     /new             start a new chat\n  \
     /list            list chats, most recent first\n  \
     /switch <n|id>   switch to a chat\n  \
     /delete [n|id]   delete a chat (default: the current one)\n  \
     /history         show the current chat\n  \
     /help            show this help\n  \
     /quit            exit"
}
