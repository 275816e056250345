// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits.
//!
//! Both external capabilities (the embedder and the inference backend) extend
//! [`PluginAdapter`] and use `#[async_trait]` so they can sit behind `Arc<dyn _>`.

pub mod adapter;
pub mod backend;
pub mod embedding;

pub use adapter::PluginAdapter;
pub use backend::GenerationBackend;
pub use embedding::EmbeddingAdapter;
