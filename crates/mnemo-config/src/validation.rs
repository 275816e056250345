// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::MnemoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.ollama.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("ollama.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if !(0.0..=2.0).contains(&config.ollama.temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "ollama.temperature must be between 0.0 and 2.0, got {}",
                config.ollama.temperature
            ),
        });
    }

    if config.ollama.context_window == 0 {
        errors.push(ConfigError::Validation {
            message: "ollama.context_window must be greater than 0".to_string(),
        });
    }

    if config.ollama.model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "ollama.model must not be empty".to_string(),
        });
    }

    if config.memory.data_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "memory.data_dir must not be empty".to_string(),
        });
    }

    if config.memory.max_results == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.max_results must be at least 1".to_string(),
        });
    }

    if config.memory.embedding_dim == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.embedding_dim must be at least 1".to_string(),
        });
    }

    if config.memory.auto_prune_days < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.auto_prune_days must be non-negative, got {}",
                config.memory.auto_prune_days
            ),
        });
    }

    let open = &config.reasoning.open_tag;
    let close = &config.reasoning.close_tag;
    if open.is_empty() || close.is_empty() {
        errors.push(ConfigError::Validation {
            message: "reasoning.open_tag and reasoning.close_tag must not be empty".to_string(),
        });
    } else if open == close {
        errors.push(ConfigError::Validation {
            message: format!("reasoning.open_tag and reasoning.close_tag must differ, both are `{open}`"),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
