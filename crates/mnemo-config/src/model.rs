// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of being silently ignored.

use std::path::PathBuf;

use mnemo_core::MnemoError;
use serde::{Deserialize, Serialize};

/// Top-level mnemo configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Local inference backend.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Long-term vector memory.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Reasoning-block delimiters recognized in streamed output.
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Path to a file containing the system prompt.
    /// Takes precedence over `system_prompt` if set.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
            system_prompt_file: None,
        }
    }
}

impl AgentConfig {
    /// Returns the effective system prompt, reading `system_prompt_file` if set.
    pub fn resolve_system_prompt(&self) -> Result<String, MnemoError> {
        match &self.system_prompt_file {
            Some(path) => {
                tracing::debug!(path = %path, "reading system prompt file");
                std::fs::read_to_string(path).map_err(|e| {
                    MnemoError::Config(format!("failed to read system_prompt_file {path}: {e}"))
                })
            }
            None => Ok(self.system_prompt.clone()),
        }
    }
}

fn default_agent_name() -> String {
    "mnemo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are mnemo, a helpful and friendly local AI assistant. \
     You remember past conversations and use them to provide personalized responses. \
     Be concise, accurate, and helpful."
        .to_string()
}

/// Ollama inference backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the Ollama HTTP API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for chat generation.
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Context window (`num_ctx`) in tokens.
    #[serde(default = "default_context_window")]
    pub context_window: u32,

    /// Timeout for the connectivity probe, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Spawn `ollama serve` once if the first probe fails.
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_chat_model(),
            temperature: default_temperature(),
            context_window: default_context_window(),
            connect_timeout_secs: default_connect_timeout_secs(),
            autostart: default_autostart(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_chat_model() -> String {
    "llama3.2".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_context_window() -> u32 {
    4096
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_autostart() -> bool {
    true
}

/// Vector memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable the memory system. When false the store runs in degraded mode.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Directory holding the persisted index pair and the embedding model.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Number of memories injected into each prompt.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Prune memories older than this many days at startup. 0 disables.
    #[serde(default)]
    pub auto_prune_days: i64,

    /// Dimension of the embedding vectors.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Minimum trimmed length, in characters, of text worth remembering.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    /// Name of the embedding model.
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            data_dir: default_data_dir(),
            max_results: default_max_results(),
            auto_prune_days: 0,
            embedding_dim: default_embedding_dim(),
            min_text_chars: default_min_text_chars(),
            model_name: default_model_name(),
        }
    }
}

impl MemoryConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("mnemo"))
        .unwrap_or_else(|| PathBuf::from("data"))
        .display()
        .to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_embedding_dim() -> usize {
    384
}

fn default_min_text_chars() -> usize {
    5
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

/// Reasoning-block delimiters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReasoningConfig {
    #[serde(default = "default_open_tag")]
    pub open_tag: String,

    #[serde(default = "default_close_tag")]
    pub close_tag: String,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            open_tag: default_open_tag(),
            close_tag: default_close_tag(),
        }
    }
}

fn default_open_tag() -> String {
    "<think>".to_string()
}

fn default_close_tag() -> String {
    "</think>".to_string()
}
