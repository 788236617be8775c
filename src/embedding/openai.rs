//! `OpenAI` embedding backend using the `async-openai` crate.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequest, CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;

use super::Embedder;
use crate::agent::config::AgentConfig;
use crate::error::AgentError;

/// `OpenAI`-compatible embedding backend.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
    timeout: Duration,
}

impl OpenAiEmbedder {
    /// Creates a new embedder from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
            timeout: config.timeout,
        }
    }

    /// Only the `text-embedding-3` family accepts an explicit dimension.
    fn supports_dimensions(&self) -> bool {
        self.model.starts_with("text-embedding-3")
    }

    fn build_request(&self, texts: Vec<String>) -> Result<CreateEmbeddingRequest, AgentError> {
        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(self.model.clone())
            .input(EmbeddingInput::StringArray(texts));
        if self.supports_dimensions() {
            let dim = u32::try_from(self.dimension).map_err(|_| AgentError::Configuration {
                message: format!("embedding dimension {} is too large", self.dimension),
            })?;
            args.dimensions(dim);
        }
        args.build().map_err(|e| AgentError::Embedding {
            message: e.to_string(),
        })
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AgentError> {
        let expected = texts.len();
        let request = self.build_request(texts)?;

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| AgentError::Embedding {
                message: format!("request timed out after {:?}", self.timeout),
            })?
            .map_err(|e| AgentError::Embedding {
                message: e.to_string(),
            })?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        if data.len() != expected {
            return Err(AgentError::Embedding {
                message: format!("expected {expected} embeddings, got {}", data.len()),
            });
        }
        if let Some(bad) = data.iter().find(|e| e.embedding.len() != self.dimension) {
            return Err(AgentError::Embedding {
                message: format!(
                    "embedding has dimension {}, configured {}",
                    bad.embedding.len(),
                    self.dimension
                ),
            });
        }

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AgentError::Embedding {
                message: "empty embedding response".to_string(),
            })
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AgentError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_batch(texts.to_vec()).await
    }
}
