// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use futures::stream;
use mnemo_core::types::{FragmentStream, GenerationRequest};
use mnemo_core::{GenerationBackend, MnemoError};
use mnemo_stream::{spawn_session, Delimiters, SessionHandle, SessionOutcome, StreamEvent};
use mnemo_test_utils::{MockBackend, Reply};
use tokio_util::sync::CancellationToken;

fn think() -> Delimiters {
    Delimiters::new("<think>", "</think>").unwrap()
}

fn fragments(parts: &[&str]) -> FragmentStream {
    let owned: Vec<Result<String, MnemoError>> =
        parts.iter().map(|p| Ok((*p).to_string())).collect();
    Box::pin(stream::iter(owned))
}

fn request() -> GenerationRequest {
    GenerationRequest {
        model: "m".to_string(),
        messages: vec![],
        temperature: 0.7,
        context_window: 4096,
    }
}

async fn run_to_end(mut handle: SessionHandle) -> (Vec<StreamEvent>, SessionOutcome) {
    let mut events = Vec::new();
    while let Some(event) = handle.events.recv().await {
        events.push(event);
    }
    (events, handle.outcome().await)
}

#[tokio::test]
async fn session_emits_events_in_order() {
    let handle = spawn_session(
        fragments(&["<thi", "nk>reasoning</think> answer"]),
        think(),
        CancellationToken::new(),
    );
    let (events, outcome) = run_to_end(handle).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::ReasoningStarted,
            StreamEvent::ReasoningFinished,
            StreamEvent::Token("answer".to_string()),
            StreamEvent::Complete("answer".to_string()),
        ]
    );
    assert_eq!(outcome, SessionOutcome::Completed("answer".to_string()));
}

#[tokio::test]
async fn unterminated_block_completes_with_raw_text() {
    let handle = spawn_session(fragments(&["<think>partial"]), think(), CancellationToken::new());
    let (events, outcome) = run_to_end(handle).await;

    assert_eq!(events.first(), Some(&StreamEvent::ReasoningStarted));
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Complete("<think>partial".to_string()))
    );
    assert_eq!(outcome, SessionOutcome::Completed("<think>partial".to_string()));
}

#[tokio::test]
async fn stream_failure_emits_error_without_complete() {
    let backend = MockBackend::with_replies(vec![Reply::FailAfter(
        vec!["Hello".to_string()],
        "connection reset".to_string(),
    )]);
    let stream = backend.stream_chat(request()).await.unwrap();
    let (events, outcome) = run_to_end(spawn_session(stream, think(), CancellationToken::new())).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::Token("Hello".to_string()));
    assert!(matches!(&events[1], StreamEvent::Error(reason) if reason.contains("connection reset")));
    assert!(matches!(outcome, SessionOutcome::Failed(_)));
}

#[tokio::test]
async fn cancelled_session_stops_forwarding() {
    let (tx, reply) = Reply::live();
    let backend = MockBackend::with_replies(vec![reply]);
    let stream = backend.stream_chat(request()).await.unwrap();
    let mut handle = spawn_session(stream, think(), CancellationToken::new());

    tx.send(Ok("first ".to_string())).unwrap();
    assert_eq!(
        handle.events.recv().await,
        Some(StreamEvent::Token("first ".to_string()))
    );

    handle.cancel();
    let _ = tx.send(Ok("second".to_string()));
    let next = tokio::time::timeout(Duration::from_secs(2), handle.events.recv())
        .await
        .unwrap();
    assert_eq!(next, None);
    assert_eq!(handle.outcome().await, SessionOutcome::Abandoned);
}

#[tokio::test]
async fn dropped_receiver_abandons_quietly() {
    let (tx, reply) = Reply::live();
    let backend = MockBackend::with_replies(vec![reply]);
    let stream = backend.stream_chat(request()).await.unwrap();
    let handle = spawn_session(stream, think(), CancellationToken::new());

    tx.send(Ok("nobody is listening".to_string())).unwrap();
    drop(tx);
    assert_eq!(handle.outcome().await, SessionOutcome::Abandoned);
}
