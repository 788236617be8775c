//! Single-pass retrieval without decomposition or judging.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use super::config::AgentConfig;
use super::outcome::{CollectionStats, QueryAnswer, RetrievalOutcome, Termination};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::router::CollectionRouter;
use super::searcher::{Searcher, validate_query};
use super::synthesizer::SynthesizerAgent;
use crate::core::dedupe;
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::vector_db::VectorStore;

const DESCRIPTION: &str = "This agent is suitable for simple factual questions that can be \
     answered from a single search, without breaking the question down.";

/// Vanilla retrieve-then-summarize searcher.
///
/// Routes once, embeds once, and splits `naive_top_k` evenly across the
/// selected collections.
pub struct NaiveRag {
    provider: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    router: CollectionRouter,
    synthesizer: SynthesizerAgent,
    top_k: usize,
}

impl NaiveRag {
    /// Creates a naive searcher over shared adapters.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Self {
        Self {
            provider,
            embedder,
            store,
            router: CollectionRouter::new(config, prompts.route_collections.clone()),
            synthesizer: SynthesizerAgent::new(config, prompts.summary.clone()),
            top_k: config.naive_top_k,
        }
    }

    /// Retrieves chunks for `query` in one pass.
    ///
    /// Failed collection searches are skipped and mark the outcome degraded.
    ///
    /// # Errors
    ///
    /// Returns routing chat/parse failures and embedding failures.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalOutcome, AgentError> {
        validate_query(query)?;
        let start = Instant::now();
        let mut outcome = RetrievalOutcome::empty(Termination::SingleShot);
        outcome.sub_queries.push(query.to_string());

        let (collections, usage) = self
            .router
            .select_collections(
                &*self.provider,
                &*self.store,
                query,
                self.embedder.dimension(),
            )
            .await?;
        outcome.total_tokens += u64::from(usage.total_tokens);
        outcome.rounds = 1;

        if collections.is_empty() {
            info!(query, "no relevant collections");
            outcome.elapsed = start.elapsed();
            return Ok(outcome);
        }

        let vector = self.embedder.embed_query(query).await?;
        let per_collection = (self.top_k / collections.len()).max(1);

        let mut hits = Vec::new();
        let mut stats = BTreeMap::new();
        for collection in &collections {
            let entry: &mut CollectionStats = stats.entry(collection.clone()).or_default();
            entry.searches += 1;
            match self.store.search(collection, &vector, per_collection).await {
                Ok(found) => {
                    entry.hits += found.len();
                    entry.accepted += found.len();
                    hits.extend(found);
                }
                Err(e) if e.is_degradable() => {
                    warn!(collection = %collection, error = %e, "collection search failed");
                    entry.failures += 1;
                    outcome.degraded = true;
                    outcome.errors.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        outcome.results = dedupe(hits);
        outcome.stats = stats;
        outcome.elapsed = start.elapsed();
        Ok(outcome)
    }

    /// Retrieves and writes the final answer.
    ///
    /// # Errors
    ///
    /// Returns retrieval errors and summary chat failures.
    pub async fn query(&self, query: &str) -> Result<QueryAnswer, AgentError> {
        let mut retrieval = self.retrieve(query).await?;
        let answer = self
            .synthesizer
            .summarize(&*self.provider, query, &mut retrieval)
            .await?;
        Ok(QueryAnswer { answer, retrieval })
    }
}

#[async_trait]
impl Searcher for NaiveRag {
    fn name(&self) -> &'static str {
        "naive_rag"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn retrieve(
        &self,
        query: &str,
        _max_iter: Option<usize>,
    ) -> Result<RetrievalOutcome, AgentError> {
        Self::retrieve(self, query).await
    }

    async fn query(&self, query: &str, _max_iter: Option<usize>) -> Result<QueryAnswer, AgentError> {
        Self::query(self, query).await
    }
}

impl std::fmt::Debug for NaiveRag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NaiveRag")
            .field("provider", &self.provider.name())
            .field("embedder", &self.embedder.name())
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{Call, FakeEmbedder, FakeStore, ScriptedProvider};

    fn naive(provider: Arc<ScriptedProvider>, store: Arc<FakeStore>, top_k: usize) -> NaiveRag {
        let config = AgentConfig::builder()
            .api_key("test")
            .naive_top_k(top_k)
            .build()
            .unwrap_or_else(|_| unreachable!());
        NaiveRag::new(
            provider,
            FakeEmbedder::new(),
            store,
            &config,
            &PromptSet::defaults(),
        )
    }

    #[tokio::test]
    async fn test_splits_top_k_across_collections() {
        let provider = ScriptedProvider::new(|call, _| match call {
            Call::RouteCollections => Ok(r#"["a", "b"]"#.to_string()),
            _ => Ok(String::new()),
        });
        let store = FakeStore::builder()
            .collection("a", "first", &["a1", "a2", "a3"])
            .collection("b", "second", &["b1", "b2", "b3"])
            .build();
        let outcome = naive(provider.clone(), store, 4)
            .retrieve("q")
            .await
            .unwrap_or_else(|_| unreachable!());

        let texts: Vec<&str> = outcome.results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a1", "a2", "b1", "b2"]);
        assert_eq!(provider.count(Call::Judge), 0);
        assert_eq!(outcome.total_tokens, 10);
        assert_eq!(outcome.termination, Termination::SingleShot);
    }

    #[tokio::test]
    async fn test_per_collection_top_k_is_at_least_one() {
        let provider = ScriptedProvider::new(|_, _| Ok(r#"["a", "b", "c"]"#.to_string()));
        let store = FakeStore::builder()
            .collection("a", "x", &["same", "a2"])
            .collection("b", "y", &["same"])
            .collection("c", "z", &["c1"])
            .build();
        let outcome = naive(provider, store, 2)
            .retrieve("q")
            .await
            .unwrap_or_else(|_| unreachable!());
        let texts: Vec<&str> = outcome.results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["same", "c1"]);
    }

    #[tokio::test]
    async fn test_query_summarizes() {
        let provider = ScriptedProvider::new(|call, _| match call {
            Call::Summary => Ok("answer".to_string()),
            _ => Ok(String::new()),
        });
        let store = FakeStore::builder().collection("only", "", &["fact"]).build();
        let answer = naive(provider, store, 10)
            .query("q")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.answer, "answer");
        assert_eq!(answer.retrieval.results.len(), 1);
        assert_eq!(answer.total_tokens(), 10);
    }
}
