// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation backend that replays scripted replies.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::{mpsc, Mutex};

use mnemo_core::types::{
    AdapterType, FragmentStream, GenerationRequest, HealthStatus, ModelInfo,
};
use mnemo_core::{GenerationBackend, MnemoError, PluginAdapter};

/// One scripted answer to `stream_chat`.
pub enum Reply {
    /// Yields these fragments, then ends.
    Fragments(Vec<String>),
    /// Yields these fragments, then fails with the given message.
    FailAfter(Vec<String>, String),
    /// `stream_chat` itself fails, as when the server is unreachable.
    ConnectError(String),
    /// Fragments are fed by the test through the paired sender.
    Live(mpsc::UnboundedReceiver<Result<String, MnemoError>>),
}

impl Reply {
    pub fn fragments<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reply::Fragments(parts.into_iter().map(Into::into).collect())
    }

    /// A reply whose fragments arrive whenever the returned sender pushes them.
    /// Dropping the sender ends the stream.
    pub fn live() -> (mpsc::UnboundedSender<Result<String, MnemoError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Reply::Live(rx))
    }
}

/// A backend popping [`Reply`] scripts from a FIFO queue and recording
/// every request it receives. An empty queue streams `"mock response"`.
#[derive(Clone, Default)]
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    models: Arc<Vec<ModelInfo>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = Arc::new(models);
        self
    }

    pub async fn push(&self, reply: Reply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn stream_chat(&self, request: GenerationRequest) -> Result<FragmentStream, MnemoError> {
        self.requests.lock().await.push(request);
        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Reply::fragments(["mock response"]));

        match reply {
            Reply::Fragments(parts) => Ok(Box::pin(stream::iter(parts.into_iter().map(Ok)))),
            Reply::FailAfter(parts, message) => {
                let items = parts
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(MnemoError::Provider {
                        message,
                        source: None,
                    })));
                Ok(Box::pin(stream::iter(items)))
            }
            Reply::ConnectError(message) => Err(MnemoError::Provider {
                message,
                source: None,
            }),
            Reply::Live(rx) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }))),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, MnemoError> {
        Ok(self.models.as_ref().clone())
    }
}
