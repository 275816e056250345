// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo memory` maintenance commands.

use clap::Subcommand;
use colored::Colorize;
use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_memory::{MemoryEntry, MemoryStats, ScoredEntry};

use crate::runtime::{self, ModelFetch};

#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Show entry count and index size.
    Stats,
    /// List stored memories.
    List,
    /// Find the memories closest to a query.
    Search {
        query: String,
        /// Number of results.
        #[arg(short = 'k', long = "top-k", default_value_t = 5)]
        top_k: usize,
    },
    /// Remove memories older than the given number of days.
    Prune { days: i64 },
    /// Remove every memory.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Add a tag to a memory.
    Tag { id: usize, tag: String },
    /// Remove a tag from a memory.
    Untag { id: usize, tag: String },
}

pub async fn run(config: MnemoConfig, command: MemoryCommand) -> Result<(), MnemoError> {
    let fetch = match command {
        MemoryCommand::Search { .. } => ModelFetch::Download,
        _ => ModelFetch::IfPresent,
    };
    let Some(store) = runtime::open_memory(&config, fetch).await else {
        println!("memory is disabled (memory.enabled = false)");
        return Ok(());
    };

    match command {
        MemoryCommand::Stats => {
            println!("{}", format_stats(&store.stats().await));
        }
        MemoryCommand::List => {
            let entries = store.entries().await;
            if entries.is_empty() {
                println!("{}", "no memories".dimmed());
            }
            for entry in &entries {
                println!("{}", format_entry(entry));
            }
        }
        MemoryCommand::Search { query, top_k } => {
            if store.is_degraded() {
                return Err(MnemoError::Embedding {
                    message: "search needs the embedding model, which could not be loaded"
                        .to_string(),
                });
            }
            let hits = store.retrieve(&query, top_k).await;
            if hits.is_empty() {
                println!("{}", "no matches".dimmed());
            }
            for hit in &hits {
                println!("{}", format_hit(hit));
            }
        }
        MemoryCommand::Prune { days } => {
            let removed = store.prune(days).await;
            println!("removed {removed} memories older than {days} days");
        }
        MemoryCommand::Clear { yes } => {
            if !yes && !confirm("Delete all memories? This cannot be undone.")? {
                println!("aborted");
                return Ok(());
            }
            store.clear().await;
            println!("memory cleared");
        }
        MemoryCommand::Tag { id, tag } => {
            store.tag(id, &tag).await;
            print_entry_or_missing(&store.entries().await, id);
        }
        MemoryCommand::Untag { id, tag } => {
            store.untag(id, &tag).await;
            print_entry_or_missing(&store.entries().await, id);
        }
    }

    let stats = store.stats().await;
    if !stats.durable {
        eprintln!("{}", "warning: the last change could not be saved to disk".yellow());
    }
    Ok(())
}

fn print_entry_or_missing(entries: &[MemoryEntry], id: usize) {
    match entries.get(id) {
        Some(entry) => println!("{}", format_entry(entry)),
        None => println!("no memory with id {id}"),
    }
}

pub fn confirm(question: &str) -> Result<bool, MnemoError> {
    let mut rl = rustyline::DefaultEditor::new()
        .map_err(|e| MnemoError::Internal(format!("failed to initialize readline: {e}")))?;
    match rl.readline(&format!("{question} [y/N] ")) {
        Ok(answer) => Ok(matches!(answer.trim(), "y" | "Y" | "yes")),
        Err(_) => Ok(false),
    }
}

pub fn format_stats(stats: &MemoryStats) -> String {
    let mut out = format!(
        "memories: {}\nindex size: {}",
        stats.total_memories,
        human_bytes(stats.index_file_size)
    );
    if stats.degraded {
        out.push_str("\nembedder: unavailable");
    }
    out
}

fn format_entry(entry: &MemoryEntry) -> String {
    let mut line = format!("[{}] {}", entry.embedding_id, entry.text);
    if !entry.tags.is_empty() {
        line.push_str(&format!(" #{}", entry.tags.join(" #")));
    }
    if let Some(ts) = &entry.timestamp {
        line.push_str(&format!(" ({ts})"));
    }
    line
}

fn format_hit(hit: &ScoredEntry) -> String {
    format!("{:>8.4}  {}", hit.score, format_entry(&hit.entry))
}

fn human_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}
