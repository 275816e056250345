// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! mnemo - a local chat assistant with long-term vector memory.

mod memory_cmd;
mod models;
mod runtime;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use mnemo_config::MnemoConfig;

/// mnemo - a local chat assistant with long-term vector memory.
#[derive(Parser, Debug)]
#[command(name = "mnemo", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat interactively (the default).
    Shell,
    /// Inspect and maintain the memory store.
    Memory {
        #[command(subcommand)]
        action: memory_cmd::MemoryCommand,
    },
    /// List models available on the Ollama server.
    Models,
}

fn load_config(path: Option<&std::path::Path>) -> MnemoConfig {
    let loaded = match path {
        Some(path) => mnemo_config::load_and_validate_path(path),
        None => mnemo_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            mnemo_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    runtime::init_tracing(&config.agent.log_level);

    let result = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell::run_shell(config).await,
        Commands::Memory { action } => memory_cmd::run(config, action).await,
        Commands::Models => models::run_models(config).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}
