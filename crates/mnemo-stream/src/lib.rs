// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming response processing for mnemo.
//!
//! Models often wrap intermediate reasoning in a delimited block such as
//! `<think>...</think>`. [`ReasoningFilter`] separates that block from the
//! answer as fragments arrive, and [`session`] drives a filter over a
//! backend's fragment stream on its own task, delivering [`StreamEvent`]s
//! in order over a channel.

pub mod event;
pub mod filter;
pub mod session;

pub use event::StreamEvent;
pub use filter::{Delimiters, ReasoningFilter};
pub use session::{run_session, spawn_session, SessionHandle, SessionOutcome};
