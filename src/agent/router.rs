//! Collection routing.
//!
//! Chooses which vector-store collections a query is searched against.
//! Collections of a different embedding dimension are never candidates.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::message::TokenUsage;
use super::prompt::build_route_collections_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::{CollectionInfo, parse_list};
use crate::error::AgentError;
use crate::vector_db::VectorStore;

/// Agent that selects relevant collections for a query.
pub struct CollectionRouter {
    model: String,
    system_prompt: String,
    enabled: bool,
}

impl CollectionRouter {
    /// Creates a router. With `config.route_collections` off, every
    /// dimension-compatible collection is selected without an LLM call.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.chat_model.clone(),
            system_prompt,
            enabled: config.route_collections,
        }
    }

    /// Selects the collections to search for `query`.
    ///
    /// An empty selection is not an error; the caller searches nothing and
    /// the round yields zero results.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::VectorStore`] if collections cannot be listed,
    /// [`AgentError::ApiRequest`] on chat failure, and
    /// [`AgentError::ResponseParse`] if the reply is not a list of names.
    pub async fn select_collections(
        &self,
        provider: &dyn LlmProvider,
        store: &dyn VectorStore,
        query: &str,
        dim: usize,
    ) -> Result<(Vec<String>, TokenUsage), AgentError> {
        let candidates = store.list_collections(Some(dim)).await?;

        if candidates.is_empty() {
            warn!(dim, "no collections match the embedding dimension");
            return Ok((Vec::new(), TokenUsage::default()));
        }

        let all: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        if !self.enabled || candidates.len() == 1 {
            return Ok((all, TokenUsage::default()));
        }

        let user_msg = build_route_collections_prompt(query, &candidates);
        let response = self.execute(provider, &user_msg).await?;
        let picked = parse_list(&response.content)?;

        let selected = merge_selection(&candidates, picked, store.default_collection());
        debug!(
            query,
            selected = ?selected,
            tokens = response.usage.total_tokens,
            "routed collections"
        );
        Ok((selected, response.usage))
    }
}

/// Combines the LLM's picks with the always-searched collections.
///
/// Unknown names are dropped. Collections without a description and the
/// default collection are appended when missing. First occurrence wins.
fn merge_selection(
    candidates: &[CollectionInfo],
    picked: Vec<String>,
    default_collection: &str,
) -> Vec<String> {
    let known = |name: &str| candidates.iter().any(|c| c.name == name);
    let mut selected: Vec<String> = Vec::new();

    for name in picked {
        let name = name.trim().to_string();
        if !known(&name) {
            warn!(collection = %name, "router picked an unknown collection");
            continue;
        }
        if !selected.contains(&name) {
            selected.push(name);
        }
    }

    for c in candidates {
        let always = c.description.trim().is_empty() || c.name == default_collection;
        if always && !selected.contains(&c.name) {
            selected.push(c.name.clone());
        }
    }

    selected
}

#[async_trait]
impl Agent for CollectionRouter {
    fn name(&self) -> &'static str {
        "collection_router"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::ROUTE_COLLECTIONS_SYSTEM_PROMPT;
    use crate::agent::testing::{Call, FakeStore, ScriptedProvider, TOKENS_PER_CALL};

    fn router(enabled: bool) -> CollectionRouter {
        let config = AgentConfig::builder()
            .api_key("test")
            .route_collections(enabled)
            .build()
            .unwrap_or_else(|_| unreachable!());
        CollectionRouter::new(&config, ROUTE_COLLECTIONS_SYSTEM_PROMPT.to_string())
    }

    fn info(name: &str, description: &str) -> CollectionInfo {
        CollectionInfo {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_merge_drops_unknown_and_duplicates() {
        let candidates = [info("papers", "research papers"), info("wiki", "encyclopedia")];
        let picked = vec![
            "wiki".to_string(),
            "imaginary".to_string(),
            " wiki ".to_string(),
        ];
        assert_eq!(merge_selection(&candidates, picked, "deepsearch"), vec!["wiki"]);
    }

    #[test]
    fn test_merge_always_includes_undescribed_and_default() {
        let candidates = [
            info("papers", "research papers"),
            info("misc", ""),
            info("deepsearch", "default corpus"),
        ];
        let selected = merge_selection(&candidates, vec!["papers".to_string()], "deepsearch");
        assert_eq!(selected, vec!["papers", "misc", "deepsearch"]);
    }

    #[test]
    fn test_merge_empty_pick_can_be_empty() {
        let candidates = [info("papers", "research papers"), info("wiki", "encyclopedia")];
        assert!(merge_selection(&candidates, Vec::new(), "deepsearch").is_empty());
    }

    #[tokio::test]
    async fn test_disabled_routing_selects_all_without_llm() {
        let provider = ScriptedProvider::new(|_, _| Ok("['papers']".to_string()));
        let store = FakeStore::builder()
            .collection("papers", "research papers", &[])
            .collection("wiki", "encyclopedia", &[])
            .collection_with_dim("wide", 3, &[])
            .build();

        let (selected, usage) = router(false)
            .select_collections(&*provider, &*store, "what is rust?", 2)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(selected, vec!["papers", "wiki"]);
        assert_eq!(usage.total_tokens, 0);
        assert_eq!(provider.count(Call::RouteCollections), 0);
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_single_matching_dimension_skips_llm() {
        let provider = ScriptedProvider::new(|_, _| Ok("['wide']".to_string()));
        let store = FakeStore::builder()
            .collection("papers", "research papers", &[])
            .collection_with_dim("wide", 3, &[])
            .build();

        let (selected, usage) = router(true)
            .select_collections(&*provider, &*store, "q", 2)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(selected, vec!["papers"]);
        assert_eq!(usage.total_tokens, 0);
        assert_eq!(provider.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_llm_pick_of_other_dimension_is_dropped() {
        let provider = ScriptedProvider::new(|_, _| Ok("['wide', 'wiki']".to_string()));
        let store = FakeStore::builder()
            .collection("papers", "research papers", &[])
            .collection("wiki", "encyclopedia", &[])
            .collection_with_dim("wide", 3, &[])
            .build();

        let (selected, usage) = router(true)
            .select_collections(&*provider, &*store, "q", 2)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(selected, vec!["wiki"]);
        assert_eq!(usage.total_tokens, TOKENS_PER_CALL);
        let messages = provider.messages(Call::RouteCollections);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("papers"));
        assert!(!messages[0].contains("wide"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_parse_error() {
        let provider = ScriptedProvider::new(|_, _| Ok("no idea".to_string()));
        let store = FakeStore::builder()
            .collection("papers", "research papers", &[])
            .collection("wiki", "encyclopedia", &[])
            .build();

        let result = router(true)
            .select_collections(&*provider, &*store, "q", 2)
            .await;

        assert!(matches!(result, Err(AgentError::ResponseParse { .. })));
        assert_eq!(provider.count(Call::RouteCollections), 1);
    }

    #[tokio::test]
    async fn test_no_matching_collection_is_empty() {
        let provider = ScriptedProvider::new(|_, _| Ok("['wide']".to_string()));
        let store = FakeStore::builder().collection_with_dim("wide", 3, &[]).build();

        let (selected, _) = router(true)
            .select_collections(&*provider, &*store, "q", 2)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(selected.is_empty());
        assert_eq!(provider.total_calls(), 0);
    }
}
