use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use innova_application::{SendOutcome, SessionReconciler};
use innova_core::session::SessionStore;
use innova_infrastructure::config_service::{normalize_base_url, HOSTED_BACKEND_URL};
use innova_infrastructure::{ClientConfig, FileKeyValueStore, JsonSessionStorage};
use innova_interaction::HttpChatTransport;

mod command;
mod helper;
mod render;

use command::{help_text, resolve_target, Command};
use helper::{CliHelper, SessionTargets};

/// How long pending title requests may run after `/quit`.
const TITLE_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "innovachat")]
#[command(about = "InnovaChat - terminal chat client", long_about = None)]
struct Cli {
    /// Base URL of the chat service
    #[arg(long, conflicts_with = "hosted")]
    backend_url: Option<String>,

    /// Use the hosted chat service
    #[arg(long)]
    hosted: bool,

    /// Directory where chats are stored
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl Cli {
    fn apply_to(&self, config: &mut ClientConfig) -> Result<()> {
        if self.hosted {
            config.backend_url = HOSTED_BACKEND_URL.to_string();
        }
        if let Some(url) = &self.backend_url {
            config.backend_url = normalize_base_url(url)?;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = Some(secs);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("innova=warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load().context("Failed to load configuration")?;
    cli.apply_to(&mut config)?;

    // ===== Backend Initialization =====
    let data_dir = config.resolved_data_dir()?;
    let key_value = Arc::new(FileKeyValueStore::new(&data_dir));
    let storage = Arc::new(JsonSessionStorage::new(key_value));
    let store = Arc::new(
        SessionStore::open(storage)
            .await
            .with_context(|| format!("Failed to open chats in {}", data_dir.display()))?,
    );
    let transport = Arc::new(HttpChatTransport::from_config(&config)?);
    let reconciler = SessionReconciler::new(store, transport);

    tracing::info!(
        "[innovachat] Backend {}, data dir {}",
        config.backend_url,
        data_dir.display()
    );

    // ===== REPL Setup =====
    let targets = SessionTargets::default();
    targets.refresh(&reconciler.sessions().await);
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new(targets.clone())));

    println!("{}", "=== InnovaChat ===".bright_magenta().bold());
    render::print_info("Type a message to chat, '/help' for commands, '/quit' to exit.");
    println!();
    show_active(&reconciler).await;

    let mut title_tasks: Vec<JoinHandle<()>> = Vec::new();

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match Command::parse(trimmed) {
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    command => {
                        if let Some(task) = handle_command(&reconciler, command).await {
                            title_tasks.push(task);
                        }
                        title_tasks.retain(|t| !t.is_finished());
                        targets.refresh(&reconciler.sessions().await);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                render::print_error(&format!("Error: {:?}", err));
                break;
            }
        }
    }

    // Let in-flight title requests land so the titles are persisted
    for task in title_tasks {
        if tokio::time::timeout(TITLE_SHUTDOWN_GRACE, task).await.is_err() {
            tracing::warn!("[innovachat] Title generation still running at exit");
        }
    }

    Ok(())
}

/// Runs one REPL command. Returns the title task a send may have started.
async fn handle_command(
    reconciler: &SessionReconciler,
    command: Command,
) -> Option<JoinHandle<()>> {
    match command {
        Command::Send(text) => return send(reconciler, &text).await,
        Command::New => match reconciler.new_chat().await {
            Ok(session) => render::print_session(&session),
            Err(e) => render::print_error(&format!("Could not create chat: {}", e)),
        },
        Command::List => {
            let sessions = reconciler.sessions().await;
            let active_id = reconciler.store().active_id().await;
            render::print_session_list(&sessions, active_id.as_deref());
        }
        Command::Switch(target) => {
            let sessions = reconciler.sessions().await;
            match resolve_target(&sessions, &target) {
                Some(session) => match reconciler.select_chat(&session.local_id).await {
                    Ok(_) => show_active(reconciler).await,
                    Err(e) => render::print_error(&format!("Could not switch chat: {}", e)),
                },
                None => render::print_error(&format!("No chat matches '{}'", target)),
            }
        }
        Command::Delete(target) => {
            let local_id = match target {
                Some(target) => {
                    let sessions = reconciler.sessions().await;
                    resolve_target(&sessions, &target).map(|s| s.local_id.clone())
                }
                None => reconciler.store().active_id().await,
            };
            match local_id {
                Some(local_id) => match reconciler.delete_chat(&local_id).await {
                    Ok(deletion) => {
                        render::print_info(&format!("Deleted '{}'", deletion.removed.title));
                        render::print_session(&deletion.active);
                    }
                    Err(e) => render::print_error(&format!("Could not delete chat: {}", e)),
                },
                None => render::print_error("No chat to delete"),
            }
        }
        Command::History => show_active(reconciler).await,
        Command::Help => render::print_info(help_text()),
        Command::Unknown(input) => {
            render::print_error(&format!("Unknown command '{}'. Type /help.", input))
        }
        Command::Quit => {}
    }
    None
}

async fn send(reconciler: &SessionReconciler, text: &str) -> Option<JoinHandle<()>> {
    render::print_info("InnovaChat is typing...");
    match reconciler.send_message(text).await {
        Ok(SendOutcome::Settled {
            bot_message,
            title_task,
            ..
        }) => {
            render::print_message(&bot_message);
            title_task
        }
        Ok(SendOutcome::Failed { session, error }) => {
            tracing::debug!("[innovachat] Send failed: {:?}", error);
            if let Some(notice) = session.messages.last() {
                render::print_error(&notice.content);
            }
            None
        }
        Err(e) if e.is_validation() => {
            render::print_error(&e.to_string());
            None
        }
        Err(e) => {
            render::print_error(&format!("Could not save the chat: {}", e));
            None
        }
    }
}

/// Prints the active chat, first pulling its history if it is empty locally.
async fn show_active(reconciler: &SessionReconciler) {
    let Some(active) = reconciler.active_session().await else {
        return;
    };
    if let Err(e) = reconciler.restore_history(&active.local_id).await {
        tracing::warn!(
            "[innovachat] Could not restore history for {}: {}",
            active.local_id,
            e
        );
    }
    if let Some(session) = reconciler.store().find(&active.local_id).await {
        render::print_session(&session);
    }
}
