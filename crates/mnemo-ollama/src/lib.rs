// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama backend for mnemo.
//!
//! Talks to a local Ollama server over its native HTTP API: `/api/tags`
//! for reachability and the model list, `/api/chat` for streaming
//! generation (newline-delimited JSON).

pub mod client;
pub mod ndjson;
pub mod types;

pub use client::OllamaClient;
