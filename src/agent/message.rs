//! Chat types shared by every provider.
//!
//! A provider turns a [`ChatRequest`] into a [`ChatResponse`]: text plus
//! the token count the orchestrator accumulates.

use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed role instructions.
    System,
    /// The question or material to act on.
    User,
    /// Model output.
    Assistant,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// Role instructions.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single chat completion call.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Messages in conversation order.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
    /// Completion length cap.
    pub max_tokens: Option<u32>,
}

/// Token counts reported for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt side.
    pub prompt_tokens: u32,
    /// Completion side.
    pub completion_tokens: u32,
    /// What the run total is charged.
    pub total_tokens: u32,
}

/// Result of a chat call.
///
/// Empty `content` is a valid empty completion. Failures travel through
/// the provider's `Err` path instead.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Completion text.
    pub content: String,
    /// Reported usage.
    pub usage: TokenUsage,
}
