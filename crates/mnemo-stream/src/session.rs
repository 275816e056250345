// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives a [`ReasoningFilter`] over a backend fragment stream.
//!
//! Events go out over a bounded mpsc channel in the order they are
//! produced. A session ends in one of three ways: the stream finishes
//! (`Complete`), the stream fails (`Error`), or the consumer walks away by
//! cancelling the token or dropping the receiver. Abandonment is silent.

use futures::StreamExt;
use mnemo_core::types::FragmentStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::event::StreamEvent;
use crate::filter::{Delimiters, ReasoningFilter};

const EVENT_BUFFER: usize = 64;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The stream ended normally; carries the clean answer.
    Completed(String),
    /// The stream failed with this reason.
    Failed(String),
    /// Cancelled, or nobody was listening any more.
    Abandoned,
}

/// A running session spawned by [`spawn_session`].
pub struct SessionHandle {
    /// Ordered session events.
    pub events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    /// Stops forwarding. Events already queued stay readable.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the session task and returns how it ended.
    ///
    /// Drain `events` first: the receiver is dropped here, so a session
    /// still trying to deliver reports itself abandoned.
    pub async fn outcome(self) -> SessionOutcome {
        let SessionHandle { events, task, .. } = self;
        drop(events);
        task.await.unwrap_or(SessionOutcome::Abandoned)
    }
}

/// Starts a session on a new tokio task.
pub fn spawn_session(
    fragments: FragmentStream,
    delimiters: Delimiters,
    cancel: CancellationToken,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let task = tokio::spawn(run_session(
        fragments,
        ReasoningFilter::new(delimiters),
        tx,
        cancel.clone(),
    ));
    SessionHandle {
        events: rx,
        cancel,
        task,
    }
}

/// Runs a session to the end on the current task.
pub async fn run_session(
    mut fragments: FragmentStream,
    mut filter: ReasoningFilter,
    events: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) -> SessionOutcome {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("session cancelled");
                return SessionOutcome::Abandoned;
            }
            next = fragments.next() => next,
        };

        match next {
            Some(Ok(fragment)) => {
                for event in filter.push(&fragment) {
                    if !deliver(&events, &cancel, event).await {
                        return SessionOutcome::Abandoned;
                    }
                }
            }
            Some(Err(e)) => {
                let reason = e.to_string();
                warn!(error = %reason, "fragment stream failed");
                deliver(&events, &cancel, StreamEvent::Error(reason.clone())).await;
                return SessionOutcome::Failed(reason);
            }
            None => break,
        }
    }

    let mut final_text = String::new();
    for event in filter.finish() {
        if let StreamEvent::Complete(text) = &event {
            final_text = text.clone();
        }
        if !deliver(&events, &cancel, event).await {
            return SessionOutcome::Abandoned;
        }
    }
    debug!(chars = final_text.len(), "session complete");
    SessionOutcome::Completed(final_text)
}

/// Sends one event. False when the session has been abandoned.
async fn deliver(
    events: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
    event: StreamEvent,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}
