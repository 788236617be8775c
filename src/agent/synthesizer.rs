//! Synthesizer agent for the final answer.
//!
//! Takes the original query, the sub-query history, and the accepted
//! chunks, and writes the answer handed back to the user.

use async_trait::async_trait;
use tracing::info;

use super::config::AgentConfig;
use super::outcome::RetrievalOutcome;
use super::prompt::build_summary_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::error::AgentError;

/// Answer returned when retrieval accepted no chunks.
pub const NO_RESULTS_ANSWER: &str =
    "No relevant information was found in the knowledge base for this query.";

/// Agent that writes the final answer from retrieved chunks.
pub struct SynthesizerAgent {
    model: String,
    system_prompt: String,
    text_window: bool,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.chat_model.clone(),
            system_prompt,
            text_window: config.text_window,
        }
    }

    /// Writes the answer for `query` from a finished retrieval run and adds
    /// the summary call's tokens to `outcome.total_tokens`.
    ///
    /// With no accepted chunks the chat call is skipped and
    /// [`NO_RESULTS_ANSWER`] is returned.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] when the chat call fails.
    pub async fn summarize(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        outcome: &mut RetrievalOutcome,
    ) -> Result<String, AgentError> {
        if outcome.results.is_empty() {
            info!(query, "no accepted chunks, skipping summary");
            return Ok(NO_RESULTS_ANSWER.to_string());
        }

        let chunks = outcome.results.iter().map(|r| {
            if self.text_window {
                r.context_text()
            } else {
                r.text.as_str()
            }
        });
        let user_msg = build_summary_prompt(query, &outcome.sub_queries, chunks);
        let response = self.execute(provider, &user_msg).await?;
        outcome.total_tokens += u64::from(response.usage.total_tokens);
        Ok(response.content)
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        4096
    }
}
