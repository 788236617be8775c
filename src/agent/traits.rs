//! The single-call agent abstraction.
//!
//! Each LLM role in the pipeline (decomposer, judge, reflector, both
//! routers, summarizer) is a fixed system prompt plus sampling settings.
//! Running one is always exactly one chat call.

use async_trait::async_trait;
use tracing::debug;

use super::message::{ChatMessage, ChatRequest, ChatResponse};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// An LLM role with a fixed system prompt.
///
/// Implementors interpret the returned text themselves; the usage in the
/// response is what the caller adds to its token total.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Role name used in logs.
    fn name(&self) -> &'static str;

    /// Chat model for this role.
    fn model(&self) -> &str;

    /// Role instructions.
    fn system_prompt(&self) -> &str;

    /// Deterministic unless overridden.
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Completion length cap.
    fn max_tokens(&self) -> u32 {
        1024
    }

    /// Sends `user_msg` under this role's system prompt.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<ChatResponse, AgentError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![
                ChatMessage::system(self.system_prompt()),
                ChatMessage::user(user_msg),
            ],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
        };

        let response = provider.chat(&request).await?;
        debug!(
            agent = self.name(),
            tokens = response.usage.total_tokens,
            "agent call complete"
        );
        Ok(response)
    }
}
