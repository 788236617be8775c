//! Query decomposition agent.
//!
//! Breaks the original question into a short list of sub-queries that
//! seed the first search round.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::message::ChatResponse;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::parse_list;
use crate::error::AgentError;

/// Maximum sub-queries kept from one decomposition.
pub const MAX_SUB_QUERIES: usize = 4;

/// Agent that decomposes a question into sub-queries.
pub struct DecomposerAgent {
    model: String,
    system_prompt: String,
}

impl DecomposerAgent {
    /// Creates a new decomposer with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.chat_model.clone(),
            system_prompt,
        }
    }

    /// Executes the agent and parses the sub-query list.
    ///
    /// Blank entries are dropped and the list is capped at
    /// [`MAX_SUB_QUERIES`]. An empty list is a valid answer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] on chat failure and
    /// [`AgentError::ResponseParse`] when the reply is not a list.
    pub async fn decompose(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<(Vec<String>, ChatResponse), AgentError> {
        let response = self.execute(provider, user_msg).await?;
        let sub_queries = Self::parse_sub_queries(&response.content, MAX_SUB_QUERIES)?;
        Ok((sub_queries, response))
    }

    /// Parses and caps a list of queries.
    pub(crate) fn parse_sub_queries(content: &str, cap: usize) -> Result<Vec<String>, AgentError> {
        let items = parse_list(content)?;
        Ok(items
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(cap)
            .collect())
    }
}

#[async_trait]
impl Agent for DecomposerAgent {
    fn name(&self) -> &'static str {
        "decomposer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}
