//! Relevance judge for retrieved chunks.
//!
//! One chat call per chunk, answered with a binary verdict. Judging chunks
//! individually keeps the expected output trivially parseable.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::message::ChatResponse;
use super::prompt::build_judge_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::Verdict;
use crate::error::AgentError;

/// Agent that decides whether one chunk helps answer a set of questions.
pub struct JudgeAgent {
    model: String,
    system_prompt: String,
}

impl JudgeAgent {
    /// Creates a new judge with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.chat_model.clone(),
            system_prompt,
        }
    }

    /// Judges one chunk against the questions.
    ///
    /// Unusable replies become [`Verdict::Reject`]; only the chat call
    /// itself can fail.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] when the provider call fails.
    pub async fn judge(
        &self,
        provider: &dyn LlmProvider,
        questions: &[String],
        chunk: &str,
    ) -> Result<(Verdict, ChatResponse), AgentError> {
        let user_msg = build_judge_prompt(questions, chunk);
        let response = self.execute(provider, &user_msg).await?;
        Ok((Verdict::parse(&response.content), response))
    }
}

#[async_trait]
impl Agent for JudgeAgent {
    fn name(&self) -> &'static str {
        "judge"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        256
    }
}
