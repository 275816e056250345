// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reasoning-block state machine.
//!
//! The filter keeps the whole raw response and a cursor marking how much of
//! it has been classified. Delimiters are searched for in the unclassified
//! tail, so a tag split across fragments (`"<thi"` + `"nk>"`) is still
//! found. Answer text that could be the start of an open tag is held back
//! until the next fragment settles it.

use mnemo_config::model::ReasoningConfig;
use mnemo_core::MnemoError;
use regex::Regex;
use tracing::debug;

use crate::event::StreamEvent;

/// Open/close tag pair plus the pattern that strips complete blocks.
#[derive(Debug, Clone)]
pub struct Delimiters {
    open: String,
    close: String,
    block: Regex,
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, MnemoError> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return Err(MnemoError::Config(
                "reasoning delimiters must not be empty".to_string(),
            ));
        }
        if open == close {
            return Err(MnemoError::Config(
                "reasoning open and close delimiters must differ".to_string(),
            ));
        }
        let pattern = format!("(?s){}.*?{}", regex::escape(&open), regex::escape(&close));
        let block = Regex::new(&pattern)
            .map_err(|e| MnemoError::Internal(format!("reasoning pattern: {e}")))?;
        Ok(Self { open, close, block })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    /// `raw` with every complete block removed, trimmed. Falls back to the
    /// trimmed raw text when nothing else is left.
    pub fn strip(&self, raw: &str) -> String {
        let cleaned = self.block.replace_all(raw, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            raw.trim().to_string()
        } else {
            cleaned.to_string()
        }
    }
}

impl TryFrom<&ReasoningConfig> for Delimiters {
    type Error = MnemoError;

    fn try_from(config: &ReasoningConfig) -> Result<Self, Self::Error> {
        Self::new(config.open_tag.clone(), config.close_tag.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InReasoning,
}

/// Per-response reasoning filter. Feed fragments with [`push`](Self::push)
/// and end with [`finish`](Self::finish).
#[derive(Debug)]
pub struct ReasoningFilter {
    delimiters: Delimiters,
    raw: String,
    cursor: usize,
    state: State,
    announced: bool,
}

impl ReasoningFilter {
    pub fn new(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            raw: String::new(),
            cursor: 0,
            state: State::Normal,
            announced: false,
        }
    }

    /// Appends a fragment and returns the events it produces.
    ///
    /// Answer text settled in the same call that closes a block is trimmed.
    /// Later fragments are forwarded verbatim.
    pub fn push(&mut self, fragment: &str) -> Vec<StreamEvent> {
        self.raw.push_str(fragment);
        let mut events = Vec::new();
        let mut trim = false;

        loop {
            let pending = &self.raw[self.cursor..];
            match self.state {
                State::Normal => match pending.find(self.delimiters.open.as_str()) {
                    Some(at) => {
                        let before = pending[..at].to_string();
                        emit(&before, &mut trim, &mut events);
                        self.cursor += at + self.delimiters.open.len();
                        self.state = State::InReasoning;
                        if !self.announced {
                            self.announced = true;
                            debug!("reasoning block opened");
                            events.push(StreamEvent::ReasoningStarted);
                        }
                    }
                    None => {
                        let settled = pending.len() - partial_tag_suffix(pending, &self.delimiters.open);
                        let text = pending[..settled].to_string();
                        self.cursor += settled;
                        emit(&text, &mut trim, &mut events);
                        break;
                    }
                },
                State::InReasoning => match pending.find(self.delimiters.close.as_str()) {
                    Some(at) => {
                        self.cursor += at + self.delimiters.close.len();
                        self.state = State::Normal;
                        trim = true;
                        debug!("reasoning block closed");
                        events.push(StreamEvent::ReasoningFinished);
                    }
                    None => break,
                },
            }
        }

        events
    }

    /// Flushes held-back text and returns the final clean answer as
    /// [`StreamEvent::Complete`], preceded by any flushed token.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.state == State::Normal && self.cursor < self.raw.len() {
            let rest = self.raw[self.cursor..].to_string();
            self.cursor = self.raw.len();
            emit(&rest, &mut false, &mut events);
        }
        events.push(StreamEvent::Complete(self.delimiters.strip(&self.raw)));
        events
    }
}

/// Queues answer text as a token. With `trim` set the text is trimmed and
/// the flag is cleared once something non-empty goes out.
fn emit(text: &str, trim: &mut bool, events: &mut Vec<StreamEvent>) {
    let text = if *trim { text.trim() } else { text };
    if text.is_empty() {
        return;
    }
    *trim = false;
    events.push(StreamEvent::Token(text.to_string()));
}

/// Length of the longest proper prefix of `tag` that `text` ends with.
fn partial_tag_suffix(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&n| tag.is_char_boundary(n) && text.ends_with(&tag[..n]))
        .unwrap_or(0)
}
