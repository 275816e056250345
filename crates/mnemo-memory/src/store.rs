// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vector memory store.
//!
//! Owns a [`FlatIndex`] and the parallel list of [`MemoryEntry`] records.
//! Both live behind one async mutex and every mutation persists the pair
//! before the lock is released, so `index.len() == metadata.len()` holds
//! whenever the lock is free.
//!
//! Public operations never fail the caller for resource faults. A missing
//! embedder, a corrupt file on load, or a failed write is logged and the
//! store keeps working from memory.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mnemo_config::model::MemoryConfig;
use mnemo_core::EmbeddingAdapter;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::index::FlatIndex;
use crate::persist::{self, IndexPaths};
use crate::types::{dedup_tags, EntrySource, MemoryEntry, MemoryStats, ScoredEntry};

/// Construction parameters for [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Root data directory; the pair lives in `<data_dir>/vector_index/`.
    pub data_dir: PathBuf,
    /// Vector dimension produced by the embedder.
    pub dimension: usize,
    /// Minimum length, in characters after trimming, of text worth storing.
    pub min_text_chars: usize,
}

impl From<&MemoryConfig> for StoreOptions {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            data_dir: config.data_dir(),
            dimension: config.embedding_dim,
            min_text_chars: config.min_text_chars,
        }
    }
}

/// Text that has been checked and embedded but not yet stored.
#[derive(Debug)]
pub struct PendingEntry {
    text: String,
    vector: Vec<f32>,
}

struct StoreState {
    index: FlatIndex,
    metadata: Vec<MemoryEntry>,
    durable: bool,
}

/// Embedding-backed long-term memory with paired on-disk persistence.
pub struct MemoryStore {
    paths: IndexPaths,
    min_text_chars: usize,
    embedder: Option<Arc<dyn EmbeddingAdapter>>,
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Loads the persisted pair, or starts empty if it is absent or corrupt.
    ///
    /// Passing `None` for `embedder` puts the store in degraded mode for its
    /// whole lifetime: `add` skips and `retrieve` returns nothing.
    ///
    /// The embedder's dimension wins over `options.dimension`; the configured
    /// value only applies when there is no embedder.
    pub async fn open(options: StoreOptions, embedder: Option<Arc<dyn EmbeddingAdapter>>) -> Self {
        let paths = IndexPaths::new(&options.data_dir);

        let dimension = match &embedder {
            Some(embedder) => {
                let actual = embedder.dimensions();
                if actual != options.dimension {
                    warn!(
                        configured = options.dimension,
                        embedder = actual,
                        "memory.embedding_dim does not match the embedder, using the embedder's dimension"
                    );
                }
                actual
            }
            None => options.dimension,
        };

        let (index, metadata) = match persist::load_pair(&paths, dimension).await {
            Ok(Some((index, metadata))) => {
                info!(entries = metadata.len(), "loaded memory index");
                (index, metadata)
            }
            Ok(None) => {
                debug!(dir = %paths.dir.display(), "no memory index on disk, starting empty");
                (FlatIndex::new(dimension), Vec::new())
            }
            Err(e) => {
                warn!(error = %e, dir = %paths.dir.display(), "memory index unreadable, starting empty");
                (FlatIndex::new(dimension), Vec::new())
            }
        };

        if embedder.is_none() {
            warn!("embedder unavailable, memory is disabled for this process");
        }

        metrics::gauge!("mnemo_memory_entries").set(metadata.len() as f64);

        Self {
            paths,
            min_text_chars: options.min_text_chars,
            embedder,
            state: Mutex::new(StoreState {
                index,
                metadata,
                durable: true,
            }),
        }
    }

    /// True when no embedder was available at construction.
    pub fn is_degraded(&self) -> bool {
        self.embedder.is_none()
    }

    /// Embeds and stores `text`. Returns its `embedding_id`, or `None` when
    /// the text is too short or no vector could be produced.
    pub async fn add(&self, text: &str, source: EntrySource) -> Option<usize> {
        let pending = self.embed_entry(text).await?;
        self.commit(pending, source).await
    }

    /// The embedding half of [`MemoryStore::add`]. Takes no lock, so callers
    /// can embed before entering their own critical section.
    pub async fn embed_entry(&self, text: &str) -> Option<PendingEntry> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.chars().count() < self.min_text_chars {
            debug!(chars = trimmed.chars().count(), "text too short for memory, skipping");
            return None;
        }
        let embedder = self.embedder.as_ref()?;

        match embedder.embed_one(text).await {
            Ok(vector) => Some(PendingEntry {
                text: text.to_string(),
                vector,
            }),
            Err(e) => {
                warn!(error = %e, "failed to embed memory text, skipping");
                None
            }
        }
    }

    /// Appends an embedded entry and persists the pair.
    pub async fn commit(&self, pending: PendingEntry, source: EntrySource) -> Option<usize> {
        let PendingEntry { text, vector } = pending;
        let mut state = self.state.lock().await;
        let embedding_id = match state.index.add(&vector) {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "embedding rejected by index, skipping");
                return None;
            }
        };
        state.metadata.push(MemoryEntry {
            text,
            message_id: source.message_id,
            conversation_id: source.conversation_id,
            timestamp: source.timestamp,
            tags: dedup_tags(source.tags),
            embedding_id,
        });
        self.persist_pair(&mut state).await;

        metrics::counter!("mnemo_memory_adds_total").increment(1);
        metrics::gauge!("mnemo_memory_entries").set(state.metadata.len() as f64);
        debug!(embedding_id, "memory added");
        Some(embedding_id)
    }

    /// The `top_k` entries nearest to `query`, nearest first.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<ScoredEntry> {
        let Some(embedder) = self.embedder.as_ref() else {
            return Vec::new();
        };
        if top_k == 0 || self.state.lock().await.index.is_empty() {
            return Vec::new();
        }

        let query_vector = match embedder.embed_one(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "failed to embed query, returning no memories");
                return Vec::new();
            }
        };

        let state = self.state.lock().await;
        let k = top_k.min(state.index.len());
        state
            .index
            .search(&query_vector, k)
            .into_iter()
            .filter_map(|(row, score)| {
                state.metadata.get(row).map(|entry| ScoredEntry {
                    entry: entry.clone(),
                    score,
                })
            })
            .collect()
    }

    /// Retrieved memories formatted for prompt injection, one per line as
    /// `[Memory n] text`. Empty when nothing was retrieved.
    pub async fn build_context(&self, query: &str, top_k: usize) -> String {
        self.retrieve(query, top_k)
            .await
            .iter()
            .enumerate()
            .map(|(i, scored)| format!("[Memory {}] {}", i + 1, scored.entry.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Adds `tag` to an entry. Unknown ids and existing tags are ignored.
    pub async fn tag(&self, embedding_id: usize, tag: &str) {
        let mut state = self.state.lock().await;
        let Some(entry) = state.metadata.get_mut(embedding_id) else {
            return;
        };
        if entry.tags.iter().any(|t| t == tag) {
            return;
        }
        entry.tags.push(tag.to_string());
        self.persist_metadata(&mut state).await;
    }

    /// Removes `tag` from an entry. Unknown ids and absent tags are ignored.
    pub async fn untag(&self, embedding_id: usize, tag: &str) {
        let mut state = self.state.lock().await;
        let Some(entry) = state.metadata.get_mut(embedding_id) else {
            return;
        };
        let before = entry.tags.len();
        entry.tags.retain(|t| t != tag);
        if entry.tags.len() == before {
            return;
        }
        self.persist_metadata(&mut state).await;
    }

    /// Drops entries older than `older_than_days` and rebuilds the index.
    /// Returns the number of entries removed.
    pub async fn prune(&self, older_than_days: i64) -> usize {
        self.prune_at(older_than_days, Utc::now()).await
    }

    /// [`MemoryStore::prune`] against an explicit clock.
    ///
    /// Entries with a missing or unreadable timestamp are kept. Survivors keep
    /// their relative order and are renumbered from 0. Their vectors are
    /// copied from the current index rather than re-embedded.
    pub async fn prune_at(&self, older_than_days: i64, now: DateTime<Utc>) -> usize {
        if older_than_days <= 0 {
            return 0;
        }
        let mut state = self.state.lock().await;
        if state.metadata.is_empty() {
            return 0;
        }

        let cutoff = now - Duration::days(older_than_days);
        let mut index = FlatIndex::new(state.index.dimension());
        let mut metadata = Vec::with_capacity(state.metadata.len());

        for (position, entry) in state.metadata.iter().enumerate() {
            let expired = entry.parsed_timestamp().is_some_and(|ts| ts < cutoff);
            if expired {
                continue;
            }
            let Some(vector) = state.index.row(position) else {
                warn!(position, "memory entry has no vector, dropping");
                continue;
            };
            let embedding_id = match index.add(vector) {
                Ok(row) => row,
                Err(e) => {
                    warn!(position, error = %e, "could not copy vector during prune, dropping entry");
                    continue;
                }
            };
            metadata.push(MemoryEntry {
                embedding_id,
                ..entry.clone()
            });
        }

        let removed = state.metadata.len() - metadata.len();
        if removed == 0 {
            return 0;
        }

        state.index = index;
        state.metadata = metadata;
        self.persist_pair(&mut state).await;

        metrics::counter!("mnemo_memory_pruned_total").increment(removed as u64);
        metrics::gauge!("mnemo_memory_entries").set(state.metadata.len() as f64);
        info!(removed, remaining = state.metadata.len(), older_than_days, "pruned memories");
        removed
    }

    /// Removes every entry and persists the empty pair.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.index.clear();
        state.metadata.clear();
        self.persist_pair(&mut state).await;
        metrics::gauge!("mnemo_memory_entries").set(0.0);
        info!("memory cleared");
    }

    pub async fn stats(&self) -> MemoryStats {
        let state = self.state.lock().await;
        MemoryStats {
            total_memories: state.metadata.len(),
            index_file_size: persist::index_file_size(&self.paths).await,
            degraded: self.is_degraded(),
            durable: state.durable,
        }
    }

    /// Snapshot of all entries in index order.
    pub async fn entries(&self) -> Vec<MemoryEntry> {
        self.state.lock().await.metadata.clone()
    }

    async fn persist_pair(&self, state: &mut StoreState) {
        match persist::save_pair(&self.paths, &state.index, &state.metadata).await {
            Ok(()) => state.durable = true,
            Err(e) => {
                error!(error = %e, "failed to persist memory index");
                state.durable = false;
            }
        }
    }

    async fn persist_metadata(&self, state: &mut StoreState) {
        match persist::save_metadata(&self.paths, &state.metadata).await {
            Ok(()) => state.durable = true,
            Err(e) => {
                error!(error = %e, "failed to persist memory metadata");
                state.durable = false;
            }
        }
    }
}
