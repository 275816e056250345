// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process setup shared by the subcommands.

use std::sync::Arc;

use mnemo_config::MnemoConfig;
use mnemo_core::EmbeddingAdapter;
use mnemo_memory::{MemoryStore, ModelManager, OnnxEmbedder, StoreOptions};
use tracing::{info, warn};

/// Installs the global fmt subscriber. `RUST_LOG` wins over the config level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mnemo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Whether opening memory may download the embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFetch {
    Download,
    /// Use the model only if it is already on disk.
    IfPresent,
}

/// Opens the memory store, or `None` when memory is disabled.
///
/// A missing embedder leaves the store in degraded mode rather than failing.
/// Auto-prune runs here when configured.
pub async fn open_memory(config: &MnemoConfig, fetch: ModelFetch) -> Option<Arc<MemoryStore>> {
    if !config.memory.enabled {
        info!("memory disabled by configuration");
        return None;
    }

    let embedder = acquire_embedder(config, fetch).await;
    let store = MemoryStore::open(StoreOptions::from(&config.memory), embedder).await;

    let days = config.memory.auto_prune_days;
    if days > 0 {
        let removed = store.prune(days).await;
        if removed > 0 {
            info!(removed, days, "auto-pruned old memories");
        }
    }

    Some(Arc::new(store))
}

async fn acquire_embedder(
    config: &MnemoConfig,
    fetch: ModelFetch,
) -> Option<Arc<dyn EmbeddingAdapter>> {
    let manager = ModelManager::new(config.memory.data_dir(), config.memory.model_name.clone());
    if fetch == ModelFetch::IfPresent && !manager.is_model_available() {
        return None;
    }

    let model_path = match manager.ensure_model().await {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "embedding model unavailable");
            return None;
        }
    };
    match OnnxEmbedder::new(&model_path) {
        Ok(embedder) => {
            info!(path = %model_path.display(), "embedding model loaded");
            Some(Arc::new(embedder))
        }
        Err(e) => {
            warn!(error = %e, "failed to load embedding model");
            None
        }
    }
}
