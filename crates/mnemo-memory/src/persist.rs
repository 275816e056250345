// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk layout of the index/metadata pair.
//!
//! ```text
//! <data_dir>/vector_index/
//!     index.bin        FlatIndex::to_bytes
//!     metadata.json    JSON array of MemoryEntry
//! ```
//!
//! Each file is written to a `.tmp` sibling and renamed into place, so a
//! crash mid-write never leaves a half-written file under the real name.

use std::path::{Path, PathBuf};

use mnemo_core::MnemoError;
use tracing::debug;

use crate::index::FlatIndex;
use crate::types::MemoryEntry;

const INDEX_DIR: &str = "vector_index";
const INDEX_FILE: &str = "index.bin";
const METADATA_FILE: &str = "metadata.json";

/// Locations of the persisted pair.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub dir: PathBuf,
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl IndexPaths {
    pub fn new(data_dir: &Path) -> Self {
        let dir = data_dir.join(INDEX_DIR);
        Self {
            index: dir.join(INDEX_FILE),
            metadata: dir.join(METADATA_FILE),
            dir,
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write both files. Temporaries are fully written before either rename.
pub async fn save_pair(
    paths: &IndexPaths,
    index: &FlatIndex,
    metadata: &[MemoryEntry],
) -> Result<(), MnemoError> {
    tokio::fs::create_dir_all(&paths.dir)
        .await
        .map_err(MnemoError::storage)?;

    let metadata_json = serde_json::to_vec(metadata).map_err(MnemoError::storage)?;
    let index_tmp = tmp_path(&paths.index);
    let metadata_tmp = tmp_path(&paths.metadata);

    tokio::fs::write(&index_tmp, index.to_bytes())
        .await
        .map_err(MnemoError::storage)?;
    tokio::fs::write(&metadata_tmp, metadata_json)
        .await
        .map_err(MnemoError::storage)?;

    tokio::fs::rename(&metadata_tmp, &paths.metadata)
        .await
        .map_err(MnemoError::storage)?;
    tokio::fs::rename(&index_tmp, &paths.index)
        .await
        .map_err(MnemoError::storage)?;

    debug!(entries = metadata.len(), dir = %paths.dir.display(), "memory index persisted");
    Ok(())
}

/// Write only the metadata file. Used when tags change and vectors do not.
pub async fn save_metadata(paths: &IndexPaths, metadata: &[MemoryEntry]) -> Result<(), MnemoError> {
    tokio::fs::create_dir_all(&paths.dir)
        .await
        .map_err(MnemoError::storage)?;
    let metadata_json = serde_json::to_vec(metadata).map_err(MnemoError::storage)?;
    let metadata_tmp = tmp_path(&paths.metadata);
    tokio::fs::write(&metadata_tmp, metadata_json)
        .await
        .map_err(MnemoError::storage)?;
    tokio::fs::rename(&metadata_tmp, &paths.metadata)
        .await
        .map_err(MnemoError::storage)?;
    Ok(())
}

/// Load and cross-check the pair.
///
/// `Ok(None)` means neither file exists. Any disagreement between the two
/// files (one missing, row count, `embedding_id` order, dimension) is an error.
pub async fn load_pair(
    paths: &IndexPaths,
    dimension: usize,
) -> Result<Option<(FlatIndex, Vec<MemoryEntry>)>, MnemoError> {
    let index_exists = tokio::fs::try_exists(&paths.index)
        .await
        .map_err(MnemoError::storage)?;
    let metadata_exists = tokio::fs::try_exists(&paths.metadata)
        .await
        .map_err(MnemoError::storage)?;

    match (index_exists, metadata_exists) {
        (false, false) => return Ok(None),
        (true, false) => {
            return Err(MnemoError::Internal(
                "index file present without metadata file".to_string(),
            ));
        }
        (false, true) => {
            return Err(MnemoError::Internal(
                "metadata file present without index file".to_string(),
            ));
        }
        (true, true) => {}
    }

    let index_bytes = tokio::fs::read(&paths.index)
        .await
        .map_err(MnemoError::storage)?;
    let index = FlatIndex::from_bytes(&index_bytes)?;

    let metadata_bytes = tokio::fs::read(&paths.metadata)
        .await
        .map_err(MnemoError::storage)?;
    let metadata: Vec<MemoryEntry> =
        serde_json::from_slice(&metadata_bytes).map_err(MnemoError::storage)?;

    if index.dimension() != dimension {
        return Err(MnemoError::Internal(format!(
            "index dimension {} does not match configured dimension {dimension}",
            index.dimension()
        )));
    }
    if index.len() != metadata.len() {
        return Err(MnemoError::Internal(format!(
            "index holds {} vectors but metadata holds {} entries",
            index.len(),
            metadata.len()
        )));
    }
    if let Some((position, entry)) = metadata
        .iter()
        .enumerate()
        .find(|(position, entry)| entry.embedding_id != *position)
    {
        return Err(MnemoError::Internal(format!(
            "metadata entry {position} has embedding_id {}",
            entry.embedding_id
        )));
    }

    Ok(Some((index, metadata)))
}

/// Size of the index file in bytes, 0 when missing.
pub async fn index_file_size(paths: &IndexPaths) -> u64 {
    tokio::fs::metadata(&paths.index)
        .await
        .map(|m| m.len())
        .unwrap_or(0)
}
