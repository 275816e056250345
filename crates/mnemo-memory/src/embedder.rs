// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local sentence embeddings with ONNX Runtime.
//!
//! Runs a quantized all-MiniLM-L6-v2 on CPU: tokenize, run the encoder,
//! mean-pool token states under the attention mask, L2-normalize.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use mnemo_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use mnemo_core::{EmbeddingAdapter, MnemoError, PluginAdapter};

/// Output width of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

fn embed_err(context: &str, e: impl std::fmt::Display) -> MnemoError {
    MnemoError::Embedding {
        message: format!("{context}: {e}"),
    }
}

/// Sentence embedder backed by an ONNX encoder and a HuggingFace tokenizer.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
}

// Safety: the session is only reached through the Mutex, and tokenizer
// encoding takes `&self` without interior mutation.
unsafe impl Send for OnnxEmbedder {}
unsafe impl Sync for OnnxEmbedder {}

impl OnnxEmbedder {
    /// Loads `model.onnx` and the `tokenizer.json` that sits beside it.
    pub fn new(model_path: &Path) -> Result<Self, MnemoError> {
        let model_dir = model_path.parent().ok_or_else(|| MnemoError::Embedding {
            message: format!("model path {} has no parent directory", model_path.display()),
        })?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| embed_err(&format!("loading tokenizer {}", tokenizer_path.display()), e))?;

        let session = Session::builder()
            .map_err(|e| embed_err("creating ONNX session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| embed_err("setting optimization level", e))?
            .with_intra_threads(1)
            .map_err(|e| embed_err("setting intra-op threads", e))?
            .commit_from_file(model_path)
            .map_err(|e| embed_err(&format!("loading model {}", model_path.display()), e))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Embeds one string into a unit-length vector.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embed_err("tokenization failed", e))?;

        let to_i64 = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();
        let attention_mask = to_i64(encoding.get_attention_mask());
        let seq_len = attention_mask.len();

        let shaped = |values: Vec<i64>, name: &str| {
            Array2::from_shape_vec((1, seq_len), values)
                .map_err(|e| embed_err(&format!("shaping {name}"), e))
        };
        let input_ids = shaped(to_i64(encoding.get_ids()), "input_ids")?;
        let mask = shaped(attention_mask.clone(), "attention_mask")?;
        let type_ids = shaped(to_i64(encoding.get_type_ids()), "token_type_ids")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| embed_err("ONNX session lock poisoned", e))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => TensorRef::from_array_view(&input_ids).map_err(|e| embed_err("input_ids tensor", e))?,
                "attention_mask" => TensorRef::from_array_view(&mask).map_err(|e| embed_err("attention_mask tensor", e))?,
                "token_type_ids" => TensorRef::from_array_view(&type_ids).map_err(|e| embed_err("token_type_ids tensor", e))?
            ])
            .map_err(|e| embed_err("ONNX inference failed", e))?;

        // [1, seq_len, hidden]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embed_err("reading output tensor", e))?;
        let hidden = shape
            .last()
            .map(|&d| d as usize)
            .ok_or_else(|| MnemoError::Embedding {
                message: "output tensor has no dimensions".to_string(),
            })?;

        Ok(l2_normalize(mean_pool(data, &attention_mask, hidden)))
    }
}

/// Averages the token vectors whose attention mask is set.
fn mean_pool(states: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut counted = 0usize;

    for (token, _) in states
        .chunks_exact(hidden)
        .zip(mask)
        .filter(|(_, m)| **m > 0)
    {
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
        counted += 1;
    }

    if counted > 0 {
        let n = counted as f32;
        pooled.iter_mut().for_each(|v| *v /= n);
    }
    pooled
}

fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

#[async_trait]
impl PluginAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx-minilm"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(match self.session.lock() {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(format!("session lock poisoned: {e}")),
        })
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbedder {
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        let embeddings = input
            .texts
            .iter()
            .map(|text| self.embed_text(text))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: EMBEDDING_DIM,
        })
    }
}
