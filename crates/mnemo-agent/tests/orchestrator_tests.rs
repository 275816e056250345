// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mnemo_agent::{Orchestrator, OrchestratorSettings, TurnHandle, TurnOutcome};
use mnemo_core::types::{AdapterType, ChatRole, EmbeddingInput, EmbeddingOutput, HealthStatus};
use mnemo_core::{EmbeddingAdapter, MnemoError, PluginAdapter};
use mnemo_memory::{EntrySource, MemoryStore, StoreOptions};
use mnemo_stream::{Delimiters, SessionOutcome, StreamEvent};
use mnemo_test_utils::{HashEmbedder, MockBackend, Reply};

const DIM: usize = 16;

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        model: "llama3.2".to_string(),
        temperature: 0.7,
        context_window: 4096,
        system_prompt: "You are helpful.".to_string(),
        max_results: 5,
        delimiters: Delimiters::new("<think>", "</think>").unwrap(),
    }
}

async fn memory(dir: &std::path::Path) -> Arc<MemoryStore> {
    let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(HashEmbedder::new(DIM));
    Arc::new(
        MemoryStore::open(
            StoreOptions {
                data_dir: dir.to_path_buf(),
                dimension: DIM,
                min_text_chars: 5,
            },
            Some(embedder),
        )
        .await,
    )
}

/// Hash embedder that parks on texts containing `"slow reply"` until released.
struct GatedEmbedder {
    inner: HashEmbedder,
    gate: tokio::sync::Semaphore,
    parked: tokio::sync::Notify,
}

impl GatedEmbedder {
    fn new() -> Self {
        Self {
            inner: HashEmbedder::new(DIM),
            gate: tokio::sync::Semaphore::new(0),
            parked: tokio::sync::Notify::new(),
        }
    }
}

#[async_trait]
impl PluginAdapter for GatedEmbedder {
    fn name(&self) -> &str {
        "gated"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for GatedEmbedder {
    fn dimensions(&self) -> usize {
        DIM
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        if input.texts.iter().any(|t| t.contains("slow reply")) {
            self.parked.notify_one();
            self.gate.acquire().await.unwrap().forget();
        }
        self.inner.embed(input).await
    }
}

async fn run_to_end(mut handle: TurnHandle) -> (Vec<StreamEvent>, TurnOutcome) {
    let mut events = Vec::new();
    while let Some(event) = handle.events.recv().await {
        events.push(event);
    }
    (events, handle.finish().await)
}

#[tokio::test]
async fn turn_streams_and_remembers_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let memory = memory(dir.path()).await;
    let backend = MockBackend::with_replies(vec![Reply::fragments([
        "<think>user wants a name",
        "</think> Your dog is Max.",
    ])]);
    let orchestrator = Orchestrator::new(Arc::new(backend.clone()), Some(memory.clone()), settings());

    let handle = orchestrator.submit("conv-1", "msg-1", "What is my dog called?").await;
    let (events, outcome) = run_to_end(handle).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::ReasoningStarted,
            StreamEvent::ReasoningFinished,
            StreamEvent::Token("Your dog is Max.".to_string()),
            StreamEvent::Complete("Your dog is Max.".to_string()),
        ]
    );
    assert_eq!(outcome.session, SessionOutcome::Completed("Your dog is Max.".to_string()));
    assert_eq!(outcome.remembered, Some(1));

    let entries = memory.entries().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "What is my dog called?");
    assert_eq!(entries[0].message_id, "msg-1");
    assert_eq!(entries[1].text, "Your dog is Max.");
    assert_eq!(entries[1].conversation_id, "conv-1");
    assert_ne!(entries[1].message_id, "msg-1");
}

#[tokio::test]
async fn retrieved_context_is_injected_without_the_new_message() {
    let dir = tempfile::tempdir().unwrap();
    let memory = memory(dir.path()).await;
    memory
        .add("User's dog is named Max", EntrySource::now("old", "conv-0"))
        .await;
    let backend = MockBackend::new();
    let orchestrator = Orchestrator::new(Arc::new(backend.clone()), Some(memory), settings());

    let (_, _) = run_to_end(orchestrator.submit("conv-1", "msg-1", "Tell me about my pet").await).await;

    let requests = backend.requests().await;
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[0].content, "You are helpful.");
    assert_eq!(
        messages[1].content,
        "Relevant context from past conversations:\n[Memory 1] User's dog is named Max"
    );
    assert_eq!(messages[2].role, ChatRole::User);
    assert_eq!(messages[2].content, "Tell me about my pet");
    assert_eq!(requests[0].model, "llama3.2");
}

#[tokio::test]
async fn empty_memory_sends_no_context_message() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockBackend::new();
    let orchestrator =
        Orchestrator::new(Arc::new(backend.clone()), Some(memory(dir.path()).await), settings());

    run_to_end(orchestrator.submit("c", "m", "first ever message").await).await;

    let messages = &backend.requests().await[0].messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, ChatRole::User);
}

#[tokio::test]
async fn connection_failure_is_a_single_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let memory = memory(dir.path()).await;
    let backend = MockBackend::with_replies(vec![Reply::ConnectError(
        "cannot reach Ollama".to_string(),
    )]);
    let orchestrator = Orchestrator::new(Arc::new(backend), Some(memory.clone()), settings());

    let (events, outcome) = run_to_end(orchestrator.submit("c", "m", "hello there").await).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Error(reason) if reason.contains("cannot reach Ollama")));
    assert!(matches!(outcome.session, SessionOutcome::Failed(_)));
    assert_eq!(outcome.remembered, None);
    // Only the user's message was stored.
    assert_eq!(memory.entries().await.len(), 1);
}

#[tokio::test]
async fn superseded_turn_is_not_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let memory = memory(dir.path()).await;
    let (slow_tx, slow) = Reply::live();
    let backend = MockBackend::with_replies(vec![slow, Reply::fragments(["newer answer"])]);
    let orchestrator = Orchestrator::new(Arc::new(backend), Some(memory.clone()), settings());

    let first = orchestrator.submit("conv", "m1", "first question").await;
    let second = orchestrator.submit("conv", "m2", "second question").await;
    let (_, second_outcome) = run_to_end(second).await;
    assert!(second_outcome.remembered.is_some());

    slow_tx.send(Ok("stale answer".to_string())).unwrap();
    drop(slow_tx);
    let (events, first_outcome) = run_to_end(first).await;

    assert!(events.contains(&StreamEvent::Complete("stale answer".to_string())));
    assert_eq!(first_outcome.remembered, None);
    let texts: Vec<String> = memory.entries().await.into_iter().map(|e| e.text).collect();
    assert!(texts.contains(&"newer answer".to_string()));
    assert!(!texts.contains(&"stale answer".to_string()));
}

#[tokio::test]
async fn other_conversations_do_not_supersede() {
    let dir = tempfile::tempdir().unwrap();
    let memory = memory(dir.path()).await;
    let (slow_tx, slow) = Reply::live();
    let backend = MockBackend::with_replies(vec![slow, Reply::fragments(["answer for b"])]);
    let orchestrator = Orchestrator::new(Arc::new(backend), Some(memory.clone()), settings());

    let first = orchestrator.submit("conv-a", "m1", "question in a").await;
    run_to_end(orchestrator.submit("conv-b", "m2", "question in b").await).await;

    slow_tx.send(Ok("answer for a".to_string())).unwrap();
    drop(slow_tx);
    let (_, outcome) = run_to_end(first).await;
    assert!(outcome.remembered.is_some());
}

#[tokio::test]
async fn cancelled_turn_stops_and_is_not_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let memory = memory(dir.path()).await;
    let (tx, live) = Reply::live();
    let backend = MockBackend::with_replies(vec![live]);
    let orchestrator = Orchestrator::new(Arc::new(backend), Some(memory.clone()), settings());

    let mut handle = orchestrator.submit("c", "m", "long question here").await;
    tx.send(Ok("partial ".to_string())).unwrap();
    assert_eq!(
        handle.events.recv().await,
        Some(StreamEvent::Token("partial ".to_string()))
    );
    handle.cancel();
    let _ = tx.send(Ok("more".to_string()));

    let (rest, outcome) = run_to_end(handle).await;
    assert!(rest.is_empty());
    assert_eq!(outcome.session, SessionOutcome::Abandoned);
    assert_eq!(memory.entries().await.len(), 1);
}

#[tokio::test]
async fn works_without_memory() {
    let backend = MockBackend::with_replies(vec![Reply::fragments(["plain reply"])]);
    let orchestrator = Orchestrator::new(Arc::new(backend.clone()), None, settings());

    let (events, outcome) = run_to_end(orchestrator.submit("c", "m", "hi there friend").await).await;
    assert_eq!(events.last(), Some(&StreamEvent::Complete("plain reply".to_string())));
    assert_eq!(outcome.remembered, None);
    assert_eq!(backend.requests().await[0].messages.len(), 2);
}

#[tokio::test]
async fn model_switch_applies_to_next_turn() {
    let backend = MockBackend::new();
    let orchestrator = Orchestrator::new(Arc::new(backend.clone()), None, settings());
    orchestrator.set_model("qwen3:8b");
    assert_eq!(orchestrator.model(), "qwen3:8b");

    run_to_end(orchestrator.submit("c", "m", "hello again").await).await;
    assert_eq!(backend.requests().await[0].model, "qwen3:8b");
}

#[tokio::test]
async fn reply_embedding_does_not_block_other_turns() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(GatedEmbedder::new());
    let adapter: Arc<dyn EmbeddingAdapter> = embedder.clone();
    let memory = Arc::new(
        MemoryStore::open(
            StoreOptions {
                data_dir: dir.path().to_path_buf(),
                dimension: DIM,
                min_text_chars: 5,
            },
            Some(adapter),
        )
        .await,
    );
    let backend = MockBackend::with_replies(vec![
        Reply::fragments(["the slow reply"]),
        Reply::fragments(["a quick answer"]),
    ]);
    let orchestrator = Orchestrator::new(Arc::new(backend), Some(memory.clone()), settings());

    let mut slow = orchestrator.submit("conv-a", "msg-a", "first question").await;
    while slow.events.recv().await.is_some() {}
    tokio::time::timeout(Duration::from_secs(5), embedder.parked.notified())
        .await
        .expect("reply embedding never started");

    let quick = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.submit("conv-b", "msg-b", "second question"),
    )
    .await
    .expect("submit blocked behind another turn's embedding");
    let (_, outcome) = run_to_end(quick).await;
    assert!(outcome.remembered.is_some());

    embedder.gate.add_permits(1);
    let outcome = slow.finish().await;
    assert!(outcome.remembered.is_some());
    let texts: Vec<String> = memory.entries().await.into_iter().map(|e| e.text).collect();
    assert!(texts.contains(&"the slow reply".to_string()));
}
