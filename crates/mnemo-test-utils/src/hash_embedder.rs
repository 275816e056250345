// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedder that needs no model files.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use mnemo_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use mnemo_core::{EmbeddingAdapter, MnemoError, PluginAdapter};

/// Maps text to a fixed vector keyed by its SHA-256.
///
/// Identical input always yields the identical vector, so a stored text
/// queried verbatim comes back at distance zero.
pub struct HashEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of texts embedded so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector for `text`, components in [-1, 1].
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dimension);
        let mut block = 0u32;
        while out.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(block.to_le_bytes());
            hasher.update(text.as_bytes());
            for byte in hasher.finalize() {
                if out.len() == self.dimension {
                    break;
                }
                out.push(f32::from(byte) / 127.5 - 1.0);
            }
            block += 1;
        }
        out
    }
}

#[async_trait]
impl PluginAdapter for HashEmbedder {
    fn name(&self) -> &str {
        "hash-embedder"
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
impl EmbeddingAdapter for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        self.calls.fetch_add(input.texts.len(), Ordering::SeqCst);
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimension,
        })
    }
}
