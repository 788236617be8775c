//! Retrieval data model and deduplication.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Free-form chunk metadata as stored alongside the vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key holding an expanded context window around a chunk.
pub const WIDER_TEXT_KEY: &str = "wider_text";

/// A chunk returned by a vector store search.
///
/// Produced by the store adapter and never mutated afterwards. `text` is
/// the identity used for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Stored embedding of the chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Chunk text.
    pub text: String,
    /// Source document reference.
    pub reference: String,
    /// Arbitrary metadata; may carry `wider_text`.
    #[serde(default)]
    pub metadata: Metadata,
    /// Similarity or distance, per the store's metric.
    pub score: f32,
}

impl RetrievalResult {
    /// Returns the expanded context window when present, else the chunk text.
    #[must_use]
    pub fn context_text(&self) -> &str {
        self.metadata
            .get(WIDER_TEXT_KEY)
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&self.text)
    }
}

/// A searchable collection and its routing description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Human-readable description used by the router.
    pub description: String,
}

/// Keeps the first result for each distinct `text`, preserving order.
#[must_use]
pub fn dedupe(results: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    let mut seen = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|r| seen.insert(r.text.clone()))
        .collect()
}

/// Appends `incoming` to `accumulated`, dropping any result whose `text`
/// is already present in either.
///
/// Returns the number of results actually appended.
pub fn dedupe_into(accumulated: &mut Vec<RetrievalResult>, incoming: Vec<RetrievalResult>) -> usize {
    let mut seen: HashSet<String> = accumulated.iter().map(|r| r.text.clone()).collect();
    let before = accumulated.len();
    accumulated.extend(incoming.into_iter().filter(|r| seen.insert(r.text.clone())));
    accumulated.len() - before
}
