// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration across memory, backend and stream processor.
//!
//! Each submitted turn bumps a per-conversation generation counter. When a
//! turn's reply completes, it is written to memory only if no newer turn
//! has started for the same conversation since.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use mnemo_config::MnemoConfig;
use mnemo_core::types::GenerationRequest;
use mnemo_core::{GenerationBackend, MnemoError};
use mnemo_memory::{EntrySource, MemoryStore};
use mnemo_stream::{run_session, Delimiters, ReasoningFilter, SessionOutcome, StreamEvent};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompt::build_messages;

const EVENT_BUFFER: usize = 64;

/// Generation parameters resolved from configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub temperature: f32,
    pub context_window: u32,
    pub system_prompt: String,
    pub max_results: usize,
    pub delimiters: Delimiters,
}

impl OrchestratorSettings {
    pub fn from_config(config: &MnemoConfig) -> Result<Self, MnemoError> {
        Ok(Self {
            model: config.ollama.model.clone(),
            temperature: config.ollama.temperature,
            context_window: config.ollama.context_window,
            system_prompt: config.agent.resolve_system_prompt()?,
            max_results: config.memory.max_results,
            delimiters: Delimiters::try_from(&config.reasoning)?,
        })
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub session: SessionOutcome,
    /// Embedding id of the stored reply, if it was stored.
    pub remembered: Option<usize>,
}

/// A turn in flight.
pub struct TurnHandle {
    /// Ordered events for display.
    pub events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    task: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    /// Stops the turn. Nothing further is displayed or remembered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the turn, including its memory write. Drain `events` first.
    pub async fn finish(self) -> TurnOutcome {
        let TurnHandle { events, task, .. } = self;
        drop(events);
        task.await.unwrap_or(TurnOutcome {
            session: SessionOutcome::Abandoned,
            remembered: None,
        })
    }
}

/// Runs chat turns against a backend with long-term memory.
pub struct Orchestrator {
    backend: Arc<dyn GenerationBackend>,
    memory: Option<Arc<MemoryStore>>,
    settings: OrchestratorSettings,
    model: StdMutex<String>,
    generations: Arc<Mutex<HashMap<String, u64>>>,
}

impl Orchestrator {
    /// `memory` is `None` when memory is switched off in configuration.
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        memory: Option<Arc<MemoryStore>>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            backend,
            memory,
            model: StdMutex::new(settings.model.clone()),
            settings,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn memory(&self) -> Option<&Arc<MemoryStore>> {
        self.memory.as_ref()
    }

    /// Model used for new turns.
    pub fn model(&self) -> String {
        match self.model.lock() {
            Ok(model) => model.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        info!(model = %model, "switching model");
        match self.model.lock() {
            Ok(mut current) => *current = model,
            Err(poisoned) => *poisoned.into_inner() = model,
        }
    }

    /// Starts a turn for `text` in `conversation_id`.
    ///
    /// Retrieval happens before the user's text is stored, so a message is
    /// never offered back to the model as its own context.
    pub async fn submit(
        &self,
        conversation_id: &str,
        user_message_id: &str,
        text: &str,
    ) -> TurnHandle {
        let generation = {
            let mut generations = self.generations.lock().await;
            let counter = generations.entry(conversation_id.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        let context = match &self.memory {
            Some(memory) => {
                let context = memory.build_context(text, self.settings.max_results).await;
                memory
                    .add(text, EntrySource::now(user_message_id, conversation_id))
                    .await;
                context
            }
            None => String::new(),
        };
        debug!(
            conversation_id,
            generation,
            context_chars = context.len(),
            "starting turn"
        );

        let request = GenerationRequest {
            model: self.model(),
            messages: build_messages(&self.settings.system_prompt, &context, text),
            temperature: self.settings.temperature,
            context_window: self.settings.context_window,
        };

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let turn = Turn {
            backend: Arc::clone(&self.backend),
            memory: self.memory.clone(),
            generations: Arc::clone(&self.generations),
            delimiters: self.settings.delimiters.clone(),
            conversation_id: conversation_id.to_string(),
            generation,
        };
        let task = tokio::spawn(turn.run(request, tx, cancel.clone()));

        TurnHandle {
            events: rx,
            cancel,
            task,
        }
    }
}

/// Everything a spawned turn needs, owned.
struct Turn {
    backend: Arc<dyn GenerationBackend>,
    memory: Option<Arc<MemoryStore>>,
    generations: Arc<Mutex<HashMap<String, u64>>>,
    delimiters: Delimiters,
    conversation_id: String,
    generation: u64,
}

impl Turn {
    async fn run(
        self,
        request: GenerationRequest,
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        let fragments = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return TurnOutcome { session: SessionOutcome::Abandoned, remembered: None };
            }
            started = self.backend.stream_chat(request) => started,
        };
        let fragments = match fragments {
            Ok(fragments) => fragments,
            Err(e) => {
                let reason = e.to_string();
                warn!(error = %reason, "backend unavailable");
                let _ = events.send(StreamEvent::Error(reason.clone())).await;
                return TurnOutcome {
                    session: SessionOutcome::Failed(reason),
                    remembered: None,
                };
            }
        };

        let session = run_session(
            fragments,
            ReasoningFilter::new(self.delimiters.clone()),
            events,
            cancel,
        )
        .await;

        let remembered = match &session {
            SessionOutcome::Completed(text) => self.remember_reply(text).await,
            _ => None,
        };
        TurnOutcome {
            session,
            remembered,
        }
    }

    async fn remember_reply(&self, text: &str) -> Option<usize> {
        let memory = self.memory.as_ref()?;
        let pending = memory.embed_entry(text).await?;

        // Held across the append so a newer turn cannot start in between.
        let generations = self.generations.lock().await;
        if generations.get(&self.conversation_id).copied() != Some(self.generation) {
            debug!(
                conversation_id = %self.conversation_id,
                generation = self.generation,
                "turn superseded, not remembering reply"
            );
            return None;
        }
        let message_id = uuid::Uuid::new_v4().to_string();
        let id = memory
            .commit(pending, EntrySource::now(message_id, self.conversation_id.clone()))
            .await;
        drop(generations);
        id
    }
}
