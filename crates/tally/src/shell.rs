// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tally shell` command implementation.
//!
//! Launches a readline REPL that talks to the same dialogue controller and
//! database as `tally serve`, through [`ConsoleChannel`].

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tally_config::model::TallyConfig;
use tally_core::{ChannelAdapter, ChannelEvent, ChatId, TallyError};
use tracing::debug;

use crate::console::ConsoleChannel;
use crate::serve::build_stack;

const GREETING: &str = "/menu";

/// Runs the `tally shell` interactive REPL.
pub async fn run_shell(config: TallyConfig, chat: String) -> Result<(), TallyError> {
    let stack = build_stack(&config).await?;
    let download_dir = std::env::current_dir().map_err(|e| TallyError::Internal(e.to_string()))?;
    let channel = ConsoleChannel::new(ChatId::new(chat), download_dir);

    let mut rl = DefaultEditor::new()
        .map_err(|e| TallyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "tally shell".bold().green());
    println!(
        "Type a number to tap an option, {} or {} to send media, {} to exit.\n",
        "/photo <path> [caption]".yellow(),
        "/voice <path>".yellow(),
        "/quit".yellow()
    );

    // Open on the main menu so there is something to tap.
    deliver(&stack.controller, &channel, GREETING).await;

    let prompt = format!("{}> ", "tally".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                deliver(&stack.controller, &channel, trimmed).await;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Normalizes one typed line and hands its events to the controller.
async fn deliver(
    controller: &tally_dialogue::DialogueController,
    channel: &ConsoleChannel,
    line: &str,
) {
    let events: Vec<ChannelEvent> = match channel.normalize_inbound(line.as_bytes()).await {
        Ok(events) => events,
        Err(e) => {
            eprintln!("{}: {e}", "error".red());
            return;
        }
    };
    for event in events {
        debug!(kind = event.kind(), "shell event");
        controller.handle(channel, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ConversationStore;

    #[tokio::test]
    async fn greeting_then_number_enters_a_flow() {
        let dir = tempfile::tempdir().unwrap();
        let config = tally_config::load_and_validate_str(&format!(
            "[storage]\ndatabase_path = \"{}\"",
            dir.path().join("shell.db").display()
        ))
        .unwrap();
        let stack = build_stack(&config).await.unwrap();
        let channel = ConsoleChannel::new(ChatId::new("local"), dir.path().to_path_buf());

        deliver(&stack.controller, &channel, GREETING).await;
        // The main menu lists "Add expense" first.
        deliver(&stack.controller, &channel, "1").await;

        let record = stack.store.get_user_state("shell:local").await.unwrap();
        assert_eq!(
            record.map(|r| r.state).as_deref(),
            Some("add_expense_select_category")
        );
    }
}
