// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo models` command.

use colored::Colorize;
use mnemo_config::MnemoConfig;
use mnemo_core::types::ModelInfo;
use mnemo_core::{GenerationBackend, MnemoError};
use mnemo_ollama::OllamaClient;

pub async fn run_models(config: MnemoConfig) -> Result<(), MnemoError> {
    let client = OllamaClient::new(&config.ollama)?;
    client.ensure_running().await?;

    let models = client.list_models().await?;
    if models.is_empty() {
        println!("no models installed; try `ollama pull {}`", config.ollama.model);
        return Ok(());
    }
    for line in format_models(&models, &config.ollama.model) {
        println!("{line}");
    }
    Ok(())
}

/// One line per model; the configured model is starred.
pub fn format_models(models: &[ModelInfo], current: &str) -> Vec<String> {
    let width = models.iter().map(|m| m.name.len()).max().unwrap_or(0);
    models
        .iter()
        .map(|m| {
            let is_current = m.name == current || m.name.strip_suffix(":latest") == Some(current);
            let marker = if is_current { "*".green().to_string() } else { " ".to_string() };
            format!("{marker} {:<width$}  {:>7}  {}", m.name, m.size, m.modified)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_model_is_marked() {
        colored::control::set_override(false);
        let models = vec![
            ModelInfo {
                name: "llama3.2:latest".to_string(),
                size: "2.0GB".to_string(),
                modified: String::new(),
            },
            ModelInfo {
                name: "qwen3:8b".to_string(),
                size: "4.9GB".to_string(),
                modified: String::new(),
            },
        ];
        let lines = format_models(&models, "llama3.2");
        assert!(lines[0].starts_with("* llama3.2:latest"));
        assert!(lines[1].starts_with("  qwen3:8b"));
    }
}
