// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo shell` command implementation.
//!
//! Interactive REPL with readline history and streamed replies. One
//! conversation per invocation; Ctrl+C while a reply streams cancels it.

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use mnemo_agent::{Orchestrator, OrchestratorSettings};
use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_ollama::OllamaClient;
use mnemo_stream::StreamEvent;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};

use crate::memory_cmd::{confirm, format_stats};
use crate::runtime::{self, ModelFetch};

/// Runs the interactive shell until `/quit`, Ctrl+C or Ctrl+D.
pub async fn run_shell(config: MnemoConfig) -> Result<(), MnemoError> {
    let client = OllamaClient::new(&config.ollama)?;
    if let Err(e) = client.ensure_running().await {
        warn!(error = %e, "ollama is not reachable");
        eprintln!("{}: {e}", "warning".yellow());
    }

    let memory = runtime::open_memory(&config, ModelFetch::Download).await;
    let settings = OrchestratorSettings::from_config(&config)?;
    let orchestrator = Orchestrator::new(Arc::new(client), memory, settings);

    let conversation_id = uuid::Uuid::new_v4().to_string();
    info!(conversation_id = %conversation_id, "shell conversation started");

    let mut rl = DefaultEditor::new()
        .map_err(|e| MnemoError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{} {}", config.agent.name.bold().green(), format!("({})", orchestrator.model()).dimmed());
    println!(
        "Type {} to exit, {} for commands.\n",
        "/quit".yellow(),
        "/help".yellow()
    );

    let prompt = format!("{}> ", "you".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Some(command) = trimmed.strip_prefix('/') {
                    match run_command(&orchestrator, command).await? {
                        Flow::Continue => continue,
                        Flow::Quit => break,
                    }
                }

                let message_id = uuid::Uuid::new_v4().to_string();
                stream_reply(&orchestrator, &conversation_id, &message_id, trimmed).await;
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

enum Flow {
    Continue,
    Quit,
}

async fn run_command(orchestrator: &Orchestrator, command: &str) -> Result<Flow, MnemoError> {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => {
            println!("/stats            memory statistics");
            println!("/clear-memory     delete every memory");
            println!("/model [name]     show or switch the model");
            println!("/quit             leave the shell");
        }
        "stats" => match orchestrator.memory() {
            Some(memory) => println!("{}", format_stats(&memory.stats().await)),
            None => println!("memory is disabled"),
        },
        "clear-memory" => match orchestrator.memory() {
            Some(memory) => {
                if confirm("Delete all memories? This cannot be undone.")? {
                    memory.clear().await;
                    println!("memory cleared");
                }
            }
            None => println!("memory is disabled"),
        },
        "model" if arg.is_empty() => println!("{}", orchestrator.model()),
        "model" => {
            orchestrator.set_model(arg);
            println!("now using {}", arg.bold());
        }
        other => println!("unknown command /{other}; try /help"),
    }
    Ok(Flow::Continue)
}

/// Streams one reply to stdout.
async fn stream_reply(orchestrator: &Orchestrator, conversation_id: &str, message_id: &str, text: &str) {
    let mut handle = orchestrator.submit(conversation_id, message_id, text).await;
    let mut stdout = std::io::stdout();
    let mut thinking = false;

    loop {
        let event = tokio::select! {
            event = handle.events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                println!("\n{}", "(interrupted)".dimmed());
                break;
            }
        };
        let Some(event) = event else { break };

        match event {
            StreamEvent::ReasoningStarted => {
                thinking = true;
                print!("{}", "thinking...".dimmed().italic());
            }
            StreamEvent::ReasoningFinished => {
                if thinking {
                    thinking = false;
                    println!();
                }
            }
            StreamEvent::Token(token) => print!("{token}"),
            StreamEvent::Complete(_) => println!("\n"),
            StreamEvent::Error(reason) => {
                if thinking {
                    println!();
                }
                eprintln!("{}: {reason}", "error".red());
            }
        }
        let _ = stdout.flush();
    }

    let _ = handle.finish().await;
}
