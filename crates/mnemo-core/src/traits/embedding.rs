// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Maps text to fixed-dimension float vectors.
///
/// Implementations must be deterministic for identical input within a
/// process lifetime; the memory store relies on this when comparing a query
/// vector against vectors computed earlier.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    /// Generates one embedding per input text, in input order.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError>;

    /// Convenience wrapper for a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let output = self
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::Embedding {
                message: "embedder returned no vectors".to_string(),
            })
    }
}
