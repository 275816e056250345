// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference backend trait.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{FragmentStream, GenerationRequest, ModelInfo};

/// A local inference server that turns a chat request into a stream of
/// incremental text fragments.
#[async_trait]
pub trait GenerationBackend: PluginAdapter {
    /// Starts a streaming chat completion.
    ///
    /// Connection failures are returned here; failures after the first
    /// fragment arrive as `Err` items on the stream.
    async fn stream_chat(&self, request: GenerationRequest) -> Result<FragmentStream, MnemoError>;

    /// Lists the models the backend can serve.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, MnemoError>;
}
