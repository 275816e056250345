// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One remembered piece of text plus its provenance.
///
/// Serialized as one record of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// The original text, untrimmed.
    pub text: String,
    /// Opaque id of the message in the external conversation store.
    #[serde(default)]
    pub message_id: String,
    /// Opaque id of the conversation in the external conversation store.
    #[serde(default)]
    pub conversation_id: String,
    /// ISO-8601 creation time. Entries without one are never pruned.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Deduplicated tags, in insertion order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Row of this entry's vector in the index.
    pub embedding_id: usize,
}

impl MemoryEntry {
    /// Parsed timestamp, if present and readable.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Provenance supplied by the caller of [`MemoryStore::add`](crate::MemoryStore::add).
#[derive(Debug, Clone, Default)]
pub struct EntrySource {
    pub message_id: String,
    pub conversation_id: String,
    pub timestamp: Option<String>,
    pub tags: Vec<String>,
}

impl EntrySource {
    /// Provenance stamped with the current local time.
    pub fn now(message_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            conversation_id: conversation_id.into(),
            timestamp: Some(Local::now().to_rfc3339()),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A retrieved entry with its raw distance to the query.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: MemoryEntry,
    /// Squared Euclidean distance; lower is more similar. Only comparable
    /// within a single query.
    pub score: f32,
}

/// Snapshot of store health and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_memories: usize,
    /// Size in bytes of the persisted index file, 0 if absent.
    pub index_file_size: u64,
    /// The embedder could not be obtained; add/retrieve are no-ops.
    pub degraded: bool,
    /// False when the most recent persist failed.
    pub durable: bool,
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one interpreted as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Drop repeated tags, keeping the first occurrence.
pub fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Convert f32 values to little-endian bytes.
pub fn vec_to_bytes(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert little-endian bytes back to f32 values. Trailing bytes that do
/// not form a whole value are ignored.
pub fn bytes_to_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_json_shape() {
        let entry = MemoryEntry {
            text: "User's dog is named Max".to_string(),
            message_id: "msg-1".to_string(),
            conversation_id: "conv-1".to_string(),
            timestamp: Some("2026-03-01T00:00:00+00:00".to_string()),
            tags: vec!["pets".to_string()],
            embedding_id: 0,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["text"], "User's dog is named Max");
        assert_eq!(json["message_id"], "msg-1");
        assert_eq!(json["conversation_id"], "conv-1");
        assert_eq!(json["tags"][0], "pets");
        assert_eq!(json["embedding_id"], 0);
    }

    #[test]
    fn entry_tolerates_missing_optional_fields() {
        let entry: MemoryEntry =
            serde_json::from_str(r#"{"text":"hello there","embedding_id":3}"#).unwrap();
        assert!(entry.timestamp.is_none());
        assert!(entry.tags.is_empty());
        assert_eq!(entry.embedding_id, 3);
    }

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let utc = parse_timestamp("2026-03-01T12:00:00Z").unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-03-01T12:00:00+00:00");

        assert!(parse_timestamp("2026-03-01T12:00:00.123456").is_some());
        assert!(parse_timestamp("2026-03-01 12:00:00").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn dedup_tags_keeps_first_occurrence() {
        let tags = dedup_tags(vec![
            "work".to_string(),
            "home".to_string(),
            "work".to_string(),
        ]);
        assert_eq!(tags, vec!["work", "home"]);
    }

    #[test]
    fn bytes_roundtrip_384_dim() {
        let original: Vec<f32> = (0..384).map(|i| i as f32 / 384.0).collect();
        let bytes = vec_to_bytes(&original);
        assert_eq!(bytes.len(), 384 * 4);
        assert_eq!(bytes_to_vec(&bytes), original);
    }

    #[test]
    fn l2_squared_basic() {
        assert_eq!(l2_squared(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(l2_squared(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }
}
