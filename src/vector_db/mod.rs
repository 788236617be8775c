//! Vector store adapters.
//!
//! The retrieval pipeline talks to storage only through [`VectorStore`]:
//! list the searchable collections and run a similarity search. Loading a
//! corpus adds collection management and inserts.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteVectorStore;

use crate::core::{CollectionInfo, Metadata, RetrievalResult};
use crate::error::AgentError;

/// Default database path, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".deepsearch/vectors.db";

/// A pre-chunked document fragment ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text.
    pub text: String,
    /// Source document reference.
    pub reference: String,
    /// Free-form metadata, stored as JSON.
    #[serde(default)]
    pub metadata: Metadata,
    /// Embedding of `text`.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Trait for vector store backends.
///
/// Search results are ordered best-first according to the store's metric.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Collection used when none is named explicitly.
    fn default_collection(&self) -> &str;

    /// Creates `collection` with vectors of length `dim`.
    ///
    /// An existing collection is kept unless `force_new` is set, in which
    /// case it is dropped and recreated empty.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the collection exists with a
    /// different dimension, or [`AgentError::VectorStore`] on backend failure.
    async fn init_collection(
        &self,
        dim: usize,
        collection: &str,
        description: &str,
        force_new: bool,
    ) -> Result<(), AgentError>;

    /// Inserts chunks into `collection`, returning how many were stored.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] for an unknown collection or a
    /// dimension mismatch, or [`AgentError::VectorStore`] on backend failure.
    async fn insert(&self, collection: &str, chunks: &[Chunk]) -> Result<usize, AgentError>;

    /// Returns up to `top_k` chunks closest to `vector`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] for an unknown collection or a
    /// dimension mismatch, or [`AgentError::VectorStore`] on backend failure.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, AgentError>;

    /// Lists known collections, optionally only those of dimension `dim`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::VectorStore`] on backend failure.
    async fn list_collections(&self, dim: Option<usize>)
    -> Result<Vec<CollectionInfo>, AgentError>;

    /// Drops `collection`. Returns `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::VectorStore`] on backend failure.
    async fn clear(&self, collection: &str) -> Result<bool, AgentError>;
}
