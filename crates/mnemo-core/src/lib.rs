// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for mnemo.
//!
//! Holds the error type, the adapter traits that the embedder and the
//! inference backend implement, and the plain data types that travel
//! between the memory store, the streaming processor and the orchestrator.

pub mod error;
pub mod traits;
pub mod types;

pub use error::MnemoError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{EmbeddingAdapter, GenerationBackend, PluginAdapter};
