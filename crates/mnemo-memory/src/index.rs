// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat exhaustive L2 index.
//!
//! Vectors are stored back to back in one `Vec<f32>`; row `i` is the vector
//! appended `i`-th. Search computes the distance to every row. An approximate
//! structure (HNSW, IVF) could replace this behind the same `add`/`search`
//! surface if memory sizes ever outgrow a linear scan.

use mnemo_core::MnemoError;

use crate::types::{bytes_to_vec, l2_squared, vec_to_bytes};

const MAGIC: &[u8; 4] = b"MNIX";
const FORMAT_VERSION: u32 = 1;
/// magic + version + dimension + row count.
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Fixed-dimension vectors with linear-scan nearest-neighbour search.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends a vector and returns its row.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize, MnemoError> {
        if vector.len() != self.dimension {
            return Err(MnemoError::Embedding {
                message: format!(
                    "vector has {} dimensions, index expects {}",
                    vector.len(),
                    self.dimension
                ),
            });
        }
        let row = self.len();
        self.data.extend_from_slice(vector);
        Ok(row)
    }

    /// The vector stored at `row`.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Returns up to `k` `(row, squared distance)` pairs, nearest first.
    ///
    /// Equal distances keep insertion order, so earlier rows win ties.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || query.len() != self.dimension || self.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| (row, l2_squared(query, vector)))
            .collect();

        // sort_by is stable: rows enter in ascending order and stay that way on ties.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored
    }

    /// Serialize as a small header followed by little-endian rows.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        out.extend_from_slice(&vec_to_bytes(&self.data));
        out
    }

    /// Parse bytes produced by [`FlatIndex::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MnemoError> {
        let corrupt = |reason: &str| MnemoError::Internal(format!("corrupt index file: {reason}"));

        if bytes.len() < HEADER_LEN {
            return Err(corrupt("truncated header"));
        }
        if &bytes[0..4] != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != FORMAT_VERSION {
            return Err(corrupt(&format!("unsupported version {version}")));
        }
        let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[12..20]);
        let count = u64::from_le_bytes(count_bytes) as usize;

        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt("row count overflows"))?;
        let body = &bytes[HEADER_LEN..];
        if body.len() != expected {
            return Err(corrupt(&format!(
                "expected {expected} payload bytes, found {}",
                body.len()
            )));
        }
        if dimension == 0 && count > 0 {
            return Err(corrupt("zero dimension"));
        }

        Ok(Self {
            dimension,
            data: bytes_to_vec(body),
        })
    }
}
