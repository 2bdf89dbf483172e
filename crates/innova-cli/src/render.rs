use chrono::{DateTime, Local, TimeZone, Utc};
use colored::Colorize;
use innova_core::session::{ChatSession, Message, Sender};

pub const WELCOME_MESSAGE: &str = "Hello! I am InnovaChat. How can I help you?";

/// Formats a timestamp as `DD/MM/YYYY HH:MM` in local time.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    format_timestamp_in(timestamp, &Local)
}

fn format_timestamp_in<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp
        .with_timezone(tz)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

pub fn print_message(message: &Message) {
    let time = format_timestamp(&message.timestamp).bright_black();
    match message.sender {
        Sender::User => {
            println!("{} {}", "You".green().bold(), time);
            for line in message.content.lines() {
                println!("{}", line.green());
            }
        }
        Sender::Bot => {
            println!("{} {}", "InnovaChat".bright_magenta().bold(), time);
            for line in message.content.lines() {
                println!("{}", line.bright_blue());
            }
        }
    }
    println!();
}

/// Prints a whole chat; an empty chat shows the welcome line instead.
pub fn print_session(session: &ChatSession) {
    println!("{}", format!("=== {} ===", session.title).bright_magenta().bold());
    if session.messages.is_empty() {
        println!("{}", WELCOME_MESSAGE.bright_blue());
        println!();
        return;
    }
    for message in &session.messages {
        print_message(message);
    }
}

pub fn print_session_list(sessions: &[ChatSession], active_id: Option<&str>) {
    for (i, session) in sessions.iter().enumerate() {
        let marker = if Some(session.local_id.as_str()) == active_id {
            "*"
        } else {
            " "
        };
        let line = format!(
            "{} {:>2}. {}  ({}, {} message(s))",
            marker,
            i + 1,
            session.title,
            format_timestamp(&session.updated_at),
            session.messages.len()
        );
        if marker == "*" {
            println!("{}", line.bright_green());
        } else {
            println!("{}", line);
        }
    }
}

pub fn print_info(text: &str) {
    println!("{}", text.bright_black());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red());
}
