//! Reflection agent producing gap queries.
//!
//! After each round the reflector sees the original query, every
//! sub-query searched so far, and the accumulated chunks, and either asks
//! for up to three more searches or signals that it is done.

use async_trait::async_trait;
use tracing::warn;

use super::config::AgentConfig;
use super::decomposer::DecomposerAgent;
use super::message::ChatResponse;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::error::AgentError;

/// Maximum gap queries kept from one reflection.
pub const MAX_GAP_QUERIES: usize = 3;

/// What the reflector decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reflection {
    /// Search these gap queries next.
    Continue(Vec<String>),
    /// No further search is warranted.
    Done,
    /// The reply could not be read; the loop stops.
    Unparseable {
        /// Parse failure description.
        message: String,
    },
}

/// Agent that decides whether more retrieval rounds are needed.
pub struct ReflectorAgent {
    model: String,
    system_prompt: String,
}

impl ReflectorAgent {
    /// Creates a new reflector with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.chat_model.clone(),
            system_prompt,
        }
    }

    /// Executes the agent and interprets its gap-query list.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] when the chat call fails. Parse
    /// failures are reported as [`Reflection::Unparseable`].
    pub async fn reflect(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<(Reflection, ChatResponse), AgentError> {
        let response = self.execute(provider, user_msg).await?;
        Ok((Self::interpret(&response.content), response))
    }

    fn interpret(content: &str) -> Reflection {
        match DecomposerAgent::parse_sub_queries(content, MAX_GAP_QUERIES) {
            Ok(gaps) if gaps.is_empty() => Reflection::Done,
            Ok(gaps) => Reflection::Continue(gaps),
            Err(e) => {
                warn!(error = %e, "reflection reply is not a query list");
                Reflection::Unparseable {
                    message: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl Agent for ReflectorAgent {
    fn name(&self) -> &'static str {
        "reflector"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}
