// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message assembly.

use mnemo_core::types::{ChatMessage, ChatRole};

/// Header placed above retrieved memories.
pub const CONTEXT_HEADER: &str = "Relevant context from past conversations:";

/// System prompt, then retrieved context, then the user's text. Empty
/// system prompt or context is left out.
pub fn build_messages(system_prompt: &str, context: &str, user_text: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(3);
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::new(ChatRole::System, system_prompt));
    }
    if !context.is_empty() {
        messages.push(ChatMessage::new(
            ChatRole::System,
            format!("{CONTEXT_HEADER}\n{context}"),
        ));
    }
    messages.push(ChatMessage::new(ChatRole::User, user_text));
    messages
}
