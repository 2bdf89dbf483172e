use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::{Arc, RwLock};

use colored::Colorize;
use innova_core::session::ChatSession;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::command::COMMAND_NAMES;

/// Commands whose argument names a chat.
const TARGET_COMMANDS: &[&str] = &["/switch", "/delete"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    local_id: String,
    title: String,
}

/// The chat list as last shown, in list order.
///
/// The REPL refreshes it after every command; the editor only reads it.
#[derive(Clone, Default)]
pub struct SessionTargets {
    inner: Arc<RwLock<Vec<Target>>>,
}

impl SessionTargets {
    pub fn refresh(&self, sessions: &[ChatSession]) {
        let targets = sessions
            .iter()
            .map(|s| Target {
                local_id: s.local_id.clone(),
                title: s.title.clone(),
            })
            .collect();
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = targets;
    }

    fn snapshot(&self) -> Vec<Target> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// rustyline helper for the chat REPL.
///
/// Completes command names, and chat positions or local ids after
/// `/switch` and `/delete`.
#[derive(Clone)]
pub struct CliHelper {
    targets: SessionTargets,
}

impl CliHelper {
    pub fn new(targets: SessionTargets) -> Self {
        Self { targets }
    }

    /// Completion for the text left of the cursor.
    fn complete_line(&self, line: &str) -> (usize, Vec<Pair>) {
        if !line.starts_with('/') {
            return (0, vec![]);
        }

        let Some((name, arg)) = line.split_once(' ') else {
            let candidates = COMMAND_NAMES
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            return (0, candidates);
        };

        let arg_start = line.len() - arg.trim_start().len();
        let arg = arg.trim_start();
        if !TARGET_COMMANDS.contains(&name) || arg.contains(char::is_whitespace) {
            return (0, vec![]);
        }

        let targets = self.targets.snapshot();
        let mut candidates: Vec<Pair> = targets
            .iter()
            .enumerate()
            .map(|(i, t)| (i + 1, t))
            .filter(|(n, _)| n.to_string().starts_with(arg))
            .map(|(n, t)| Pair {
                display: format!("{:>3}  {}", n, t.title),
                replacement: n.to_string(),
            })
            .collect();
        if !arg.is_empty() {
            candidates.extend(
                targets
                    .iter()
                    .filter(|t| t.local_id.starts_with(arg))
                    .map(|t| Pair {
                        display: format!("{}  {}", t.local_id, t.title),
                        replacement: t.local_id.clone(),
                    }),
            );
        }
        (arg_start, candidates)
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.complete_line(&line[..pos]))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Borrowed(line);
        }
        let split = line.find(char::is_whitespace).unwrap_or(line.len());
        let (name, rest) = line.split_at(split);
        Owned(format!("{}{}", name.bright_cyan(), rest))
    }

    fn highlight_char(&self, line: &str, _pos: usize, _forced: bool) -> bool {
        line.starts_with('/')
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            COMMAND_NAMES
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}
