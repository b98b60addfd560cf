//! Line-oriented stand-in for the chat transport: `/command args` or `press <token>`.

use std::fmt::Write as _;

use bliss_core::{Assistant, ButtonAction, CallbackOutcome, Invocation, Reply};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::info;

use crate::scheduler::shutdown_requested;

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Message(&'a str),
    Press(&'a str),
    Quit,
    Blank,
    Unknown,
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if line == "quit" || line == "exit" {
        return Line::Quit;
    }
    if line.starts_with('/') {
        return Line::Message(line);
    }
    match line.strip_prefix("press") {
        Some(rest) if rest.starts_with(char::is_whitespace) => Line::Press(rest.trim()),
        _ => Line::Unknown,
    }
}

pub(crate) fn format_reply(reply: &Reply) -> String {
    let mut out = reply.text.clone();
    if let Some(keyboard) = &reply.keyboard {
        for button in keyboard.buttons() {
            let target = match &button.action {
                ButtonAction::Callback(token) => format!("press {token}"),
                ButtonAction::Url(url) => url.clone(),
            };
            let _ = write!(out, "\n  [{}] -> {}", button.label, target);
        }
    }
    out
}

pub(crate) fn format_outcome(outcome: &CallbackOutcome) -> String {
    match outcome {
        CallbackOutcome::Edit(reply) => format_reply(reply),
        CallbackOutcome::Delete { origin: true } => {
            "(message deleted, command message too if permitted)".to_string()
        }
        CallbackOutcome::Delete { origin: false } => "(message deleted)".to_string(),
        CallbackOutcome::Ignore => "(stale button ignored)".to_string(),
    }
}

pub(crate) async fn run_console(
    assistant: &Assistant,
    invocation: Invocation,
    shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type /help, /list, /bliss <codename>, press <token> or quit.");
    while !shutdown_requested(&shutdown_rx) {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match classify(&line) {
            Line::Message(text) => match assistant.handle_message(&invocation, text).await {
                Some(reply) => println!("{}\n", format_reply(&reply)),
                None => println!("(no reply)\n"),
            },
            Line::Press(token) => {
                let outcome = assistant.handle_callback(&invocation, token).await;
                println!("{}\n", format_outcome(&outcome));
            }
            Line::Quit => break,
            Line::Blank => {}
            Line::Unknown => println!("Commands start with '/', buttons with 'press'.\n"),
        }
    }
    info!("Console closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bliss_core::{Button, Keyboard, MenuState};

    #[test]
    fn classifies_input_lines() {
        assert_eq!(classify("  /bliss Z01R "), Line::Message("/bliss Z01R"));
        assert_eq!(classify("press vanilla#Z01R"), Line::Press("vanilla#Z01R"));
        assert_eq!(classify("pressed"), Line::Unknown);
        assert_eq!(classify("quit"), Line::Quit);
        assert_eq!(classify("   "), Line::Blank);
        assert_eq!(classify("hello"), Line::Unknown);
    }

    #[test]
    fn replies_list_their_buttons() {
        let reply = Reply::plain("Choose an option:").with_keyboard(
            Keyboard::default()
                .single(Button::url("Download", "https://dl/x.zip"))
                .single(Button::callback("Close", &MenuState::Closed)),
        );
        assert_eq!(
            format_reply(&reply),
            "Choose an option:\n  [Download] -> https://dl/x.zip\n  [Close] -> press close"
        );
    }

    #[test]
    fn outcomes_are_described() {
        assert_eq!(
            format_outcome(&CallbackOutcome::Ignore),
            "(stale button ignored)"
        );
        assert_eq!(
            format_outcome(&CallbackOutcome::Delete { origin: false }),
            "(message deleted)"
        );
    }
}
