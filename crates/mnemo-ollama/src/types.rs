// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Ollama HTTP API.

use mnemo_core::types::{ChatMessage, ModelInfo};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

/// Per-request model options.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub num_ctx: u32,
    pub temperature: f32,
}

/// One line of a streaming `/api/chat` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

/// Body of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl From<TagModel> for ModelInfo {
    fn from(tag: TagModel) -> Self {
        let gib = tag.size.unwrap_or(0) as f64 / (1024.0 * 1024.0 * 1024.0);
        ModelInfo {
            name: tag.model.filter(|m| !m.is_empty()).unwrap_or(tag.name),
            size: format!("{gib:.1}GB"),
            modified: tag.modified_at.unwrap_or_default(),
        }
    }
}

/// Error body Ollama returns with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
