// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for mnemo.
//!
//! - [`HashEmbedder`] - deterministic vectors derived from a SHA-256 of the input
//! - [`MockBackend`] - generation backend replaying scripted fragment streams

pub mod hash_embedder;
pub mod mock_backend;

pub use hash_embedder::HashEmbedder;
pub use mock_backend::{MockBackend, Reply};
