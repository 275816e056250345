// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for mnemo.

use thiserror::Error;

/// The error type shared by every mnemo crate.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Configuration errors (invalid TOML, bad values, unreadable prompt file).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence errors (file I/O, (de)serialization of the index pair).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The embedder could not be loaded or failed to produce a vector.
    #[error("embedding error: {message}")]
    Embedding { message: String },

    /// Inference backend errors (connection failure, HTTP status, stream error).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemoError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MnemoError::Storage {
            source: Box::new(err),
        }
    }
}
