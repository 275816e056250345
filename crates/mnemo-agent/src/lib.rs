// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation orchestration for mnemo.
//!
//! A turn runs: retrieve memories for the user's text, remember the text,
//! assemble the chat messages, stream the backend's reply through a
//! reasoning filter, and remember the clean reply if the turn is still the
//! newest one for its conversation.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{Orchestrator, OrchestratorSettings, TurnHandle, TurnOutcome};
pub use prompt::build_messages;
