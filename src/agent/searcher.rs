//! Searcher abstraction and LLM-based searcher selection.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use super::config::AgentConfig;
use super::message::TokenUsage;
use super::outcome::{QueryAnswer, RetrievalOutcome};
use super::prompt::build_route_searchers_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::strip_reasoning;
use crate::error::AgentError;

/// Maximum accepted query length in bytes.
const MAX_QUERY_LEN: usize = 10_000;

static LAST_DIGIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d)\D*\z").unwrap_or_else(|_| unreachable!("digit pattern is a valid regex"))
});

/// Rejects empty and oversized queries before any model call.
///
/// # Errors
///
/// Returns [`AgentError::Orchestration`] describing the problem.
pub fn validate_query(query: &str) -> Result<(), AgentError> {
    if query.trim().is_empty() {
        return Err(AgentError::Orchestration {
            message: "Query cannot be empty".to_string(),
        });
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(AgentError::Orchestration {
            message: format!(
                "Query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                query.len()
            ),
        });
    }
    Ok(())
}

/// A retrieval strategy that can also answer.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Short identifier for logs and output.
    fn name(&self) -> &'static str;

    /// Description shown to the searcher router.
    fn description(&self) -> &str;

    /// Retrieves chunks for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on unrecoverable pipeline failures.
    async fn retrieve(
        &self,
        query: &str,
        max_iter: Option<usize>,
    ) -> Result<RetrievalOutcome, AgentError>;

    /// Retrieves chunks and writes the final answer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on unrecoverable pipeline failures.
    async fn query(&self, query: &str, max_iter: Option<usize>) -> Result<QueryAnswer, AgentError>;
}

/// Delegates each query to the searcher the LLM picks.
pub struct SearcherRouter {
    provider: std::sync::Arc<dyn LlmProvider>,
    searchers: Vec<Box<dyn Searcher>>,
    model: String,
    system_prompt: String,
}

impl SearcherRouter {
    /// Creates a router over `searchers`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if `searchers` is empty.
    pub fn new(
        provider: std::sync::Arc<dyn LlmProvider>,
        searchers: Vec<Box<dyn Searcher>>,
        config: &AgentConfig,
        system_prompt: String,
    ) -> Result<Self, AgentError> {
        if searchers.is_empty() {
            return Err(AgentError::Configuration {
                message: "searcher router needs at least one searcher".to_string(),
            });
        }
        Ok(Self {
            provider,
            searchers,
            model: config.chat_model.clone(),
            system_prompt,
        })
    }

    /// Picks the searcher for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] on chat failure and
    /// [`AgentError::ResponseParse`] if no valid index can be read.
    pub async fn route(&self, query: &str) -> Result<(&dyn Searcher, TokenUsage), AgentError> {
        if let [only] = self.searchers.as_slice() {
            return Ok((only.as_ref(), TokenUsage::default()));
        }

        let descriptions: Vec<&str> = self.searchers.iter().map(|s| s.description()).collect();
        let user_msg = build_route_searchers_prompt(query, &descriptions);
        let response = self.execute(&*self.provider, &user_msg).await?;

        let index = parse_index(&response.content, self.searchers.len())?;
        let searcher = self.searchers[index].as_ref();
        info!(query, searcher = searcher.name(), "selected searcher");
        Ok((searcher, response.usage))
    }
}

/// Reads a 1-based index from the reply and converts it to 0-based.
///
/// A reply that is not a bare integer falls back to its last digit.
fn parse_index(content: &str, count: usize) -> Result<usize, AgentError> {
    let text = strip_reasoning(content).trim();
    let parsed = text.parse::<usize>().ok().or_else(|| {
        LAST_DIGIT
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    });

    match parsed {
        Some(n) if (1..=count).contains(&n) => Ok(n - 1),
        Some(n) => Err(AgentError::ResponseParse {
            message: format!("searcher index {n} out of range 1..={count}"),
            content: content.to_string(),
        }),
        None => Err(AgentError::ResponseParse {
            message: "no searcher index in reply".to_string(),
            content: content.to_string(),
        }),
    }
}

#[async_trait]
impl Agent for SearcherRouter {
    fn name(&self) -> &'static str {
        "searcher_router"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        64
    }
}

#[async_trait]
impl Searcher for SearcherRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn description(&self) -> &str {
        "Routes each query to the best suited searcher."
    }

    async fn retrieve(
        &self,
        query: &str,
        max_iter: Option<usize>,
    ) -> Result<RetrievalOutcome, AgentError> {
        validate_query(query)?;
        let (searcher, usage) = self.route(query).await?;
        let mut outcome = searcher.retrieve(query, max_iter).await?;
        outcome.total_tokens += u64::from(usage.total_tokens);
        Ok(outcome)
    }

    async fn query(&self, query: &str, max_iter: Option<usize>) -> Result<QueryAnswer, AgentError> {
        validate_query(query)?;
        let (searcher, usage) = self.route(query).await?;
        let mut answer = searcher.query(query, max_iter).await?;
        answer.retrieval.total_tokens += u64::from(usage.total_tokens);
        Ok(answer)
    }
}

impl std::fmt::Debug for SearcherRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.searchers.iter().map(|s| s.name()).collect();
        f.debug_struct("SearcherRouter")
            .field("searchers", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::outcome::Termination;
    use crate::agent::prompt::ROUTE_SEARCHERS_SYSTEM_PROMPT;
    use crate::agent::testing::{Call, ScriptedProvider};
    use std::sync::Arc;
    use test_case::test_case;

    struct Fixed(&'static str);

    #[async_trait]
    impl Searcher for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &str {
            self.0
        }

        async fn retrieve(
            &self,
            _query: &str,
            _max_iter: Option<usize>,
        ) -> Result<RetrievalOutcome, AgentError> {
            let mut outcome = RetrievalOutcome::empty(Termination::SingleShot);
            outcome.sub_queries.push(self.0.to_string());
            outcome.total_tokens = 5;
            Ok(outcome)
        }

        async fn query(
            &self,
            query: &str,
            max_iter: Option<usize>,
        ) -> Result<QueryAnswer, AgentError> {
            Ok(QueryAnswer {
                answer: self.0.to_string(),
                retrieval: self.retrieve(query, max_iter).await?,
            })
        }
    }

    fn router(reply: &'static str, searchers: Vec<Box<dyn Searcher>>) -> (SearcherRouter, Arc<ScriptedProvider>) {
        let provider = ScriptedProvider::new(move |_, _| Ok(reply.to_string()));
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let router = SearcherRouter::new(
            provider.clone(),
            searchers,
            &config,
            ROUTE_SEARCHERS_SYSTEM_PROMPT.to_string(),
        )
        .unwrap_or_else(|_| unreachable!());
        (router, provider)
    }

    #[test_case("2", 3 => Some(1) ; "bare integer")]
    #[test_case(" 1\n", 3 => Some(0) ; "whitespace")]
    #[test_case("I pick agent [3].", 3 => Some(2) ; "last digit fallback")]
    #[test_case("<think>1 or 2?</think>2", 2 => Some(1) ; "reasoning stripped")]
    #[test_case("4", 3 => None ; "out of range")]
    #[test_case("0", 3 => None ; "zero")]
    #[test_case("none of them", 3 => None ; "no digit")]
    fn test_parse_index(content: &str, count: usize) -> Option<usize> {
        parse_index(content, count).ok()
    }

    #[tokio::test]
    async fn test_router_adds_routing_tokens() {
        let (router, provider) = router("2", vec![Box::new(Fixed("deep")), Box::new(Fixed("naive"))]);
        let answer = router
            .query("q", None)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.answer, "naive");
        assert_eq!(answer.total_tokens(), 15);
        assert_eq!(provider.count(Call::RouteSearchers), 1);
    }

    #[tokio::test]
    async fn test_single_searcher_skips_llm() {
        let (router, provider) = router("garbage", vec![Box::new(Fixed("only"))]);
        let outcome = router
            .retrieve("q", None)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(outcome.sub_queries, vec!["only"]);
        assert_eq!(outcome.total_tokens, 5);
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_choice_is_parse_error() {
        let (router, _) = router("no idea", vec![Box::new(Fixed("a")), Box::new(Fixed("b"))]);
        let result = router.retrieve("q", None).await;
        assert!(matches!(result, Err(AgentError::ResponseParse { .. })));
    }

    #[test]
    fn test_validate_query() {
        assert!(validate_query("what is rust?").is_ok());
        assert!(validate_query("  ").is_err());
        assert!(validate_query(&"x".repeat(MAX_QUERY_LEN + 1)).is_err());
    }
}
