// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term vector memory for mnemo.
//!
//! Text is embedded into fixed-size vectors, appended to a flat exhaustive
//! L2 index, and described by a parallel list of metadata records. The index
//! and the metadata are always mutated and persisted together.
//!
//! ## Architecture
//!
//! - **FlatIndex**: contiguous `f32` rows with linear-scan k-NN search
//! - **persist**: write-then-rename persistence of the index/metadata pair
//! - **MemoryStore**: add/retrieve/tag/prune/clear with degraded mode
//! - **OnnxEmbedder**: local all-MiniLM-L6-v2 inference (384 dims)
//! - **ModelManager**: first-run model download

pub mod embedder;
pub mod index;
pub mod model_manager;
pub mod persist;
pub mod store;
pub mod types;

pub use embedder::OnnxEmbedder;
pub use index::FlatIndex;
pub use model_manager::ModelManager;
pub use store::{MemoryStore, PendingEntry, StoreOptions};
pub use types::*;
