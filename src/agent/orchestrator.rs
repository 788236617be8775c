//! Iterative multi-hop retrieval.
//!
//! [`DeepSearch`] drives the loop
//! `DECOMPOSE → {SEARCH → REFLECT}* → DONE`:
//!
//! 1. Decompose the query into at most four sub-queries.
//! 2. Fan out one [`Retriever::search`] task per gap query and join them.
//! 3. Merge the round's accepted chunks into the global set, dropping any
//!    text already seen.
//! 4. Ask the reflector for at most three gap queries; stop on none.
//!
//! The loop runs at most `max_iter` SEARCH rounds whatever the model says.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::decomposer::DecomposerAgent;
use super::outcome::{QueryAnswer, RetrievalOutcome, Termination, merge_stats};
use super::prompt::{PromptSet, build_decompose_prompt, build_reflect_prompt};
use super::provider::LlmProvider;
use super::reflector::{Reflection, ReflectorAgent};
use super::retriever::{Retriever, SubQueryResult};
use super::searcher::{Searcher, validate_query};
use super::synthesizer::SynthesizerAgent;
use crate::core::dedupe_into;
use crate::embedding::Embedder;
use crate::error::AgentError;
use crate::vector_db::VectorStore;

/// Routing description of the iterative searcher.
const DESCRIPTION: &str = "This agent is suitable for handling general and simple queries, \
     such as given a topic and then writing a report, survey, or article.";

/// Iterative retrieval orchestrator.
pub struct DeepSearch {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<Retriever>,
    config: AgentConfig,
    prompts: PromptSet,
}

impl DeepSearch {
    /// Creates an orchestrator over shared adapters.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling
    /// back to compiled-in defaults.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, embedder, store, config, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    #[must_use]
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        let retriever = Arc::new(Retriever::new(
            Arc::clone(&provider),
            embedder,
            store,
            &config,
            &prompts,
        ));
        Self {
            provider,
            retriever,
            config,
            prompts,
        }
    }

    /// Runs the retrieval loop for `query`.
    ///
    /// `max_iter` overrides the configured round cap.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an empty query,
    /// [`AgentError::Configuration`] for a zero round cap, and any chat,
    /// parse, or configuration failure the loop cannot absorb. Embedding and
    /// store failures only mark the outcome as degraded.
    pub async fn retrieve(
        &self,
        query: &str,
        max_iter: Option<usize>,
    ) -> Result<RetrievalOutcome, AgentError> {
        validate_query(query)?;
        let max_iter = max_iter.unwrap_or(self.config.max_iter);
        if max_iter == 0 {
            return Err(AgentError::Configuration {
                message: "max_iter must be greater than zero".to_string(),
            });
        }

        let start = Instant::now();

        // DECOMPOSE
        let decomposer = DecomposerAgent::new(&self.config, self.prompts.decompose.clone());
        let (sub_queries, response) = decomposer
            .decompose(&*self.provider, &build_decompose_prompt(query))
            .await?;
        let mut total_tokens = u64::from(response.usage.total_tokens);

        if sub_queries.is_empty() {
            info!(query, "decomposition produced no sub-queries");
            let mut outcome = RetrievalOutcome::empty(Termination::EmptyDecomposition);
            outcome.total_tokens = total_tokens;
            outcome.elapsed = start.elapsed();
            return Ok(outcome);
        }
        info!(query, sub_queries = ?sub_queries, "decomposed query");

        let reflector = ReflectorAgent::new(&self.config, self.prompts.reflect.clone());

        let mut all_sub_queries = sub_queries.clone();
        let mut gap_queries = sub_queries;
        let mut results = Vec::new();
        let mut stats = BTreeMap::new();
        let mut errors = Vec::new();
        let mut failed_tasks = 0usize;
        let mut reflection_parse_failures = 0usize;
        let mut degraded = false;
        let mut rounds = 0usize;
        let mut termination = Termination::MaxIterations;

        for round in 1..=max_iter {
            rounds = round;

            // SEARCH
            let outputs = self.fan_out(&gap_queries, &all_sub_queries).await;

            let mut round_results = Vec::new();
            for (gap, output) in gap_queries.iter().zip(outputs) {
                match output {
                    Ok(sub) => {
                        total_tokens += sub.tokens;
                        merge_stats(&mut stats, &sub.stats);
                        if sub.abandoned {
                            failed_tasks += 1;
                        }
                        if !sub.errors.is_empty() {
                            degraded = true;
                            errors.extend(sub.errors);
                        }
                        round_results.extend(sub.accepted);
                    }
                    Err(e) if e.is_degradable() => {
                        warn!(round, sub_query = %gap, error = %e, "fan-out task failed");
                        failed_tasks += 1;
                        degraded = true;
                        errors.push(format!("{gap}: {e}"));
                    }
                    Err(e) => return Err(e),
                }
            }

            let added = dedupe_into(&mut results, round_results);
            info!(round, added, total = results.len(), tokens = total_tokens, "round complete");

            if round == max_iter {
                debug!(round, "round limit reached, skipping reflection");
                break;
            }

            // REFLECT
            let user_msg = build_reflect_prompt(
                query,
                &all_sub_queries,
                results.iter().map(|r| r.text.as_str()),
            );
            let (reflection, response) = reflector.reflect(&*self.provider, &user_msg).await?;
            total_tokens += u64::from(response.usage.total_tokens);

            match reflection {
                Reflection::Continue(gaps) => {
                    info!(round, gap_queries = ?gaps, "reflection asked for more searches");
                    all_sub_queries.extend(gaps.iter().cloned());
                    gap_queries = gaps;
                }
                Reflection::Done => {
                    info!(round, "reflection found no gaps");
                    termination = Termination::Converged;
                    break;
                }
                Reflection::Unparseable { message } => {
                    reflection_parse_failures += 1;
                    degraded = true;
                    errors.push(format!("reflection: {message}"));
                    termination = Termination::ReflectionUnparseable;
                    break;
                }
            }
        }

        info!(
            rounds,
            results = results.len(),
            tokens = total_tokens,
            termination = %termination,
            "retrieval finished"
        );

        Ok(RetrievalOutcome {
            results,
            sub_queries: all_sub_queries,
            total_tokens,
            rounds,
            termination,
            stats,
            failed_tasks,
            reflection_parse_failures,
            errors,
            degraded,
            elapsed: start.elapsed(),
        })
    }

    /// Runs [`DeepSearch::retrieve`] and writes the final answer.
    ///
    /// # Errors
    ///
    /// Returns retrieval errors and [`AgentError::ApiRequest`] if the
    /// summary call fails.
    pub async fn query(
        &self,
        query: &str,
        max_iter: Option<usize>,
    ) -> Result<QueryAnswer, AgentError> {
        let mut retrieval = self.retrieve(query, max_iter).await?;
        let synthesizer = SynthesizerAgent::new(&self.config, self.prompts.summary.clone());
        let answer = synthesizer
            .summarize(&*self.provider, query, &mut retrieval)
            .await?;
        Ok(QueryAnswer { answer, retrieval })
    }

    /// Searches every gap query concurrently and waits for all of them.
    ///
    /// Results are returned in `gap_queries` order. A panicked or cancelled
    /// task becomes an [`AgentError::Orchestration`] entry.
    async fn fan_out(
        &self,
        gap_queries: &[String],
        context_queries: &[String],
    ) -> Vec<Result<SubQueryResult, AgentError>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let context: Arc<[String]> = Arc::from(context_queries);

        let mut handles = Vec::with_capacity(gap_queries.len());
        for gap in gap_queries {
            let sem = Arc::clone(&semaphore);
            let retriever = Arc::clone(&self.retriever);
            let ctx = Arc::clone(&context);
            let q = gap.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await.map_err(|e| AgentError::Orchestration {
                    message: format!("Semaphore acquire failed: {e}"),
                })?;
                retriever.search(&q, &ctx).await
            });
            handles.push(handle);
        }

        let expected = handles.len();
        let mut results = Vec::with_capacity(expected);
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(Err(AgentError::Orchestration {
                    message: format!("Task join failed: {e}"),
                })),
            }
        }

        debug_assert_eq!(results.len(), expected, "fan-out result count mismatch");
        results
    }
}

#[async_trait]
impl Searcher for DeepSearch {
    fn name(&self) -> &'static str {
        "deep_search"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    async fn retrieve(
        &self,
        query: &str,
        max_iter: Option<usize>,
    ) -> Result<RetrievalOutcome, AgentError> {
        Self::retrieve(self, query, max_iter).await
    }

    async fn query(&self, query: &str, max_iter: Option<usize>) -> Result<QueryAnswer, AgentError> {
        Self::query(self, query, max_iter).await
    }
}

impl std::fmt::Debug for DeepSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepSearch")
            .field("provider", &self.provider.name())
            .field("retriever", &self.retriever)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
