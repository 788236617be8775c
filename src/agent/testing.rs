//! In-process fakes for pipeline tests.
//!
//! [`ScriptedProvider`] answers each chat call from a closure keyed on the
//! call's [`Call`] kind, and charges a fixed token count per call so token
//! accounting can be checked exactly.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::provider::LlmProvider;
use crate::core::{CollectionInfo, Metadata, RetrievalResult};
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::vector_db::{Chunk, VectorStore};

/// Tokens charged for every scripted chat call.
pub const TOKENS_PER_CALL: u32 = 10;

/// Which pipeline role issued a chat call, inferred from the user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Decompose,
    Judge,
    Reflect,
    Summary,
    RouteCollections,
    RouteSearchers,
}

impl Call {
    fn of(request: &ChatRequest) -> Self {
        let user = request
            .messages
            .last()
            .map_or("", |m| m.content.as_str());
        if user.contains("<chunk>") {
            Self::Judge
        } else if user.contains("<collections>") {
            Self::RouteCollections
        } else if user.contains("<agents>") {
            Self::RouteSearchers
        } else if user.contains("Are additional search queries needed?") {
            Self::Reflect
        } else if user.contains("Write the answer.") {
            Self::Summary
        } else {
            Self::Decompose
        }
    }
}

type Script = dyn Fn(Call, &str) -> Result<String, AgentError> + Send + Sync;

/// Provider whose replies come from a closure.
pub struct ScriptedProvider {
    script: Box<Script>,
    calls: Mutex<Vec<(Call, String)>>,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(Call, &str) -> Result<String, AgentError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Number of calls of the given kind so far.
    pub fn count(&self, kind: Call) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Total calls so far.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// User messages of the given kind, in call order.
    pub fn messages(&self, kind: Call) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let kind = Call::of(request);
        let user = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, user.clone()));
        let content = (self.script)(kind, &user)?;
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: TOKENS_PER_CALL / 2,
                completion_tokens: TOKENS_PER_CALL / 2,
                total_tokens: TOKENS_PER_CALL,
            },
        })
    }
}

/// Two-dimensional embedder that fails for texts containing `fail_marker`.
pub struct FakeEmbedder {
    pub fail_marker: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_marker: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing_on(marker: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_marker: Some(marker.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn dimension(&self) -> usize {
        2
    }

    #[allow(clippy::cast_precision_loss)]
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_marker.as_deref().is_some_and(|m| text.contains(m)) {
            return Err(AgentError::Embedding {
                message: "embedding service timed out".to_string(),
            });
        }
        Ok(vec![text.len() as f32, 1.0])
    }
}

struct FakeCollection {
    info: CollectionInfo,
    dim: usize,
    chunks: Vec<RetrievalResult>,
}

/// In-memory store returning every chunk of a collection for any vector.
pub struct FakeStore {
    collections: Mutex<BTreeMap<String, FakeCollection>>,
    failing: HashSet<String>,
    searches: AtomicUsize,
}

impl FakeStore {
    pub fn builder() -> FakeStoreBuilder {
        FakeStoreBuilder::default()
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeStoreBuilder {
    collections: BTreeMap<String, FakeCollection>,
    failing: HashSet<String>,
}

impl FakeStoreBuilder {
    /// Adds a dimension-2 collection holding chunks with these texts.
    pub fn collection(mut self, name: &str, description: &str, texts: &[&str]) -> Self {
        self.collections
            .insert(name.to_string(), fake_collection(name, description, 2, texts));
        self
    }

    /// Adds a collection with a different dimension.
    pub fn collection_with_dim(mut self, name: &str, dim: usize, texts: &[&str]) -> Self {
        self.collections
            .insert(name.to_string(), fake_collection(name, "other", dim, texts));
        self
    }

    /// Makes every search on `name` fail.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn build(self) -> Arc<FakeStore> {
        Arc::new(FakeStore {
            collections: Mutex::new(self.collections),
            failing: self.failing,
            searches: AtomicUsize::new(0),
        })
    }
}

fn fake_collection(name: &str, description: &str, dim: usize, texts: &[&str]) -> FakeCollection {
    FakeCollection {
        info: CollectionInfo {
            name: name.to_string(),
            description: description.to_string(),
        },
        dim,
        chunks: texts.iter().map(|t| result(t, name)).collect(),
    }
}

/// A retrieval result with the given text.
pub fn result(text: &str, reference: &str) -> RetrievalResult {
    RetrievalResult {
        embedding: vec![0.0, 1.0],
        text: text.to_string(),
        reference: reference.to_string(),
        metadata: Metadata::new(),
        score: 0.1,
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    fn default_collection(&self) -> &str {
        "deepsearch"
    }

    async fn init_collection(
        &self,
        dim: usize,
        collection: &str,
        description: &str,
        force_new: bool,
    ) -> Result<(), AgentError> {
        let mut cols = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        if force_new || !cols.contains_key(collection) {
            cols.insert(
                collection.to_string(),
                fake_collection(collection, description, dim, &[]),
            );
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, chunks: &[Chunk]) -> Result<usize, AgentError> {
        let mut cols = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        let col = cols.get_mut(collection).ok_or_else(|| AgentError::Configuration {
            message: format!("collection not found: {collection}"),
        })?;
        for c in chunks {
            col.chunks.push(RetrievalResult {
                embedding: c.embedding.clone(),
                text: c.text.clone(),
                reference: c.reference.clone(),
                metadata: c.metadata.clone(),
                score: 0.0,
            });
        }
        Ok(chunks.len())
    }

    async fn search(
        &self,
        collection: &str,
        _vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, AgentError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(collection) {
            return Err(AgentError::VectorStore {
                collection: collection.to_string(),
                message: "connection reset".to_string(),
            });
        }
        let cols = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        let col = cols.get(collection).ok_or_else(|| AgentError::Configuration {
            message: format!("collection not found: {collection}"),
        })?;
        Ok(col.chunks.iter().take(top_k).cloned().collect())
    }

    async fn list_collections(
        &self,
        dim: Option<usize>,
    ) -> Result<Vec<CollectionInfo>, AgentError> {
        let cols = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(cols
            .values()
            .filter(|c| dim.is_none_or(|d| d == c.dim))
            .map(|c| c.info.clone())
            .collect())
    }

    async fn clear(&self, collection: &str) -> Result<bool, AgentError> {
        let mut cols = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(cols.remove(collection).is_some())
    }
}

/// Extracts the chunk text from a judge message.
pub fn judged_chunk(message: &str) -> &str {
    message
        .split_once("<chunk>\n")
        .and_then(|(_, rest)| rest.split_once("\n</chunk>"))
        .map_or("", |(chunk, _)| chunk)
}
