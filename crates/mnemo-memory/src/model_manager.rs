// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-run download of the embedding model.
//!
//! Files live in `<data_dir>/models/<model_name>/{model.onnx,tokenizer.json}`.
//! The default model is fetched from HuggingFace; any other model name must
//! be placed there by hand.

use std::path::{Path, PathBuf};

use mnemo_core::MnemoError;
use tracing::info;

/// Name of the model with a known download source.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

const MODEL_URL: &str =
    "https://huggingface.co/onnx-community/all-MiniLM-L6-v2-ONNX/resolve/main/onnx/model_quantized.onnx";
const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

/// Resolves, and if needed downloads, embedding model files.
pub struct ModelManager {
    data_dir: PathBuf,
    model_name: String,
}

impl ModelManager {
    pub fn new(data_dir: PathBuf, model_name: impl Into<String>) -> Self {
        Self {
            data_dir,
            model_name: model_name.into(),
        }
    }

    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("models").join(&self.model_name)
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir().join("model.onnx")
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir().join("tokenizer.json")
    }

    /// True if both files are already on disk.
    pub fn is_model_available(&self) -> bool {
        self.model_path().exists() && self.tokenizer_path().exists()
    }

    /// Returns the model path, downloading the files first if missing.
    pub async fn ensure_model(&self) -> Result<PathBuf, MnemoError> {
        if self.is_model_available() {
            return Ok(self.model_path());
        }
        if self.model_name != DEFAULT_MODEL {
            return Err(MnemoError::Embedding {
                message: format!(
                    "model files for '{}' not found in {} and no download source is known",
                    self.model_name,
                    self.model_dir().display()
                ),
            });
        }

        let model_dir = self.model_dir();
        tokio::fs::create_dir_all(&model_dir)
            .await
            .map_err(MnemoError::storage)?;

        for (dest, url) in [
            (self.model_path(), MODEL_URL),
            (self.tokenizer_path(), TOKENIZER_URL),
        ] {
            if dest.exists() {
                continue;
            }
            info!(url, "downloading embedding model file");
            let size = download_file(url, &dest).await?;
            info!(file = %dest.display(), bytes = size, "downloaded");
        }

        info!(dir = %model_dir.display(), "embedding model ready");
        Ok(self.model_path())
    }
}

/// Fetches `url` into `dest` via a temporary sibling so a failed download
/// never leaves a truncated file under the final name.
async fn download_file(url: &str, dest: &Path) -> Result<usize, MnemoError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| download_err(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_err(url, format!("HTTP {status}")));
    }
    let bytes = response.bytes().await.map_err(|e| download_err(url, e))?;

    let tmp = dest.with_extension("part");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(MnemoError::storage)?;
    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(MnemoError::storage)?;
    Ok(bytes.len())
}

fn download_err(url: &str, e: impl std::fmt::Display) -> MnemoError {
    MnemoError::Embedding {
        message: format!("downloading {url}: {e}"),
    }
}
