//! Per-sub-query retrieval: route, embed, search, judge.
//!
//! One [`Retriever::search`] call is the unit of work the orchestrator
//! fans out. Collections are searched sequentially and every returned
//! chunk is judged individually, so a single task's log reads top to
//! bottom.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::judge::JudgeAgent;
use super::outcome::CollectionStats;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::router::CollectionRouter;
use crate::core::RetrievalResult;
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::vector_db::VectorStore;

/// What one sub-query search contributed.
#[derive(Debug, Clone, Default)]
pub struct SubQueryResult {
    /// The searched query.
    pub query: String,
    /// Chunks the judge accepted, in search order.
    pub accepted: Vec<RetrievalResult>,
    /// Tokens spent on routing and judging.
    pub tokens: u64,
    /// Per-collection counters.
    pub stats: BTreeMap<String, CollectionStats>,
    /// Absorbed failures (collection searches, judge calls).
    pub errors: Vec<String>,
    /// Set when the whole sub-query was abandoned (embedding or store
    /// listing failed); `accepted` is then empty.
    pub abandoned: bool,
}

impl SubQueryResult {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }

    fn abandon(mut self, err: &AgentError) -> Self {
        warn!(sub_query = %self.query, error = %err, "sub-query search abandoned");
        self.errors.push(format!("{}: {err}", self.query));
        self.abandoned = true;
        self
    }
}

/// Shared retrieval context for one orchestrator.
///
/// Cheap to share across spawned tasks behind an `Arc`.
pub struct Retriever {
    provider: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    router: CollectionRouter,
    judge: JudgeAgent,
    top_k: usize,
}

impl Retriever {
    /// Creates a retriever from shared adapters.
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
            judge: JudgeAgent::new(config, prompts.judge.clone()),
            top_k: config.search_top_k,
        }
    }

    /// Searches `query` across its routed collections and keeps the chunks
    /// the judge accepts for any of the questions.
    ///
    /// `context_queries` is the full sub-query set; the judge sees `query`
    /// first followed by the other entries.
    ///
    /// Embedding and store failures are absorbed into the returned
    /// [`SubQueryResult`]; a failing collection contributes nothing and the
    /// rest are still searched.
    ///
    /// # Errors
    ///
    /// Returns chat, parse, and configuration failures, which make further
    /// progress impossible.
    pub async fn search(
        &self,
        query: &str,
        context_queries: &[String],
    ) -> Result<SubQueryResult, AgentError> {
        let mut out = SubQueryResult::new(query);

        let collections = match self
            .router
            .select_collections(
                &*self.provider,
                &*self.store,
                query,
                self.embedder.dimension(),
            )
            .await
        {
            Ok((collections, usage)) => {
                out.tokens += u64::from(usage.total_tokens);
                collections
            }
            Err(e) if e.is_degradable() => return Ok(out.abandon(&e)),
            Err(e) => return Err(e),
        };

        if collections.is_empty() {
            info!(sub_query = query, "no relevant collections");
            return Ok(out);
        }

        let vector = match self.embedder.embed_query(query).await {
            Ok(v) => v,
            Err(e) if e.is_degradable() => return Ok(out.abandon(&e)),
            Err(e) => return Err(e),
        };

        let questions = judge_questions(query, context_queries);

        for collection in &collections {
            let stats = out.stats.entry(collection.clone()).or_default();
            stats.searches += 1;

            let hits = match self.store.search(collection, &vector, self.top_k).await {
                Ok(hits) => hits,
                Err(e) if e.is_degradable() => {
                    warn!(collection = %collection, sub_query = query, error = %e, "collection search failed");
                    stats.failures += 1;
                    out.errors.push(e.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };
            stats.hits += hits.len();

            let mut accepted = 0usize;
            for hit in hits {
                match self.judge.judge(&*self.provider, &questions, &hit.text).await {
                    Ok((verdict, response)) => {
                        out.tokens += u64::from(response.usage.total_tokens);
                        if verdict.is_accept() {
                            accepted += 1;
                            out.accepted.push(hit);
                        }
                    }
                    Err(e) => {
                        warn!(collection = %collection, error = %e, "relevance judgment failed, chunk rejected");
                        out.errors.push(format!("judge on '{collection}': {e}"));
                    }
                }
            }

            if let Some(stats) = out.stats.get_mut(collection) {
                stats.accepted += accepted;
            }
            if accepted == 0 {
                debug!(collection = %collection, sub_query = query, "no chunks accepted");
            } else {
                debug!(collection = %collection, sub_query = query, accepted, "chunks accepted");
            }
        }

        Ok(out)
    }
}

/// Question list shown to the judge: the searched query, then its siblings.
fn judge_questions(query: &str, context_queries: &[String]) -> Vec<String> {
    let mut questions = Vec::with_capacity(context_queries.len() + 1);
    questions.push(query.to_string());
    questions.extend(context_queries.iter().filter(|q| *q != query).cloned());
    questions
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("provider", &self.provider.name())
            .field("embedder", &self.embedder.name())
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}
