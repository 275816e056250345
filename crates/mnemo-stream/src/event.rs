// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// What a streaming session reports to its consumer.
///
/// Per session: any number of `Token`s, at most one `ReasoningStarted`,
/// and exactly one terminal `Complete` or `Error` unless abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Answer text to display now.
    Token(String),
    /// The model opened a reasoning block.
    ReasoningStarted,
    /// A reasoning block closed.
    ReasoningFinished,
    /// The stream ended; carries the answer with reasoning removed.
    Complete(String),
    /// The fragment source failed; no `Complete` follows.
    Error(String),
}
