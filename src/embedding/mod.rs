//! Embedding adapters.
//!
//! The pipeline only needs [`Embedder::embed_query`]; loading a corpus uses
//! the batch form through [`embed_in_batches`].

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

pub use openai::OpenAiEmbedder;

use crate::agent::config::AgentConfig;
use crate::error::AgentError;

/// Texts per embedding request when loading a corpus.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 256;

/// Trait for embedding backends.
///
/// Every vector returned by one embedder has the same length,
/// [`Embedder::dimension`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Vector dimension produced by this embedder.
    fn dimension(&self) -> usize;

    /// Embeds a single query text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Embedding`] on transport or API failures.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AgentError>;

    /// Embeds several document texts, one vector per input in order.
    ///
    /// The default loops over [`Embedder::embed_query`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Embedding`] on the first failure.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AgentError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_query(text).await?);
        }
        Ok(vectors)
    }
}

/// Embeds `texts` in batches of `batch_size`, preserving order.
///
/// # Errors
///
/// Returns the first batch failure.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, AgentError> {
    let mut vectors = Vec::with_capacity(texts.len());
    for (idx, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        debug!(batch = idx, size = batch.len(), "embedding batch");
        vectors.extend(embedder.embed_documents(batch).await?);
    }
    Ok(vectors)
}

/// Creates an [`Embedder`] based on the configured embedding provider.
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_embedder(config: &AgentConfig) -> Result<Arc<dyn Embedder>, AgentError> {
    match config.embedding_provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as `[len, calls]` and counts single-text calls.
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn dimension(&self) -> usize {
            2
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AgentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, n as f32])
        }
    }

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let vectors = embed_in_batches(&embedder, &texts, 2)
            .await
            .unwrap_or_default();
        assert_eq!(vectors.len(), 5);
        let lens: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lens, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_create_unknown_embedder() {
        let config = AgentConfig::builder()
            .api_key("test")
            .embedding_provider("unknown")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            create_embedder(&config),
            Err(AgentError::UnsupportedProvider { .. })
        ));
    }

    #[test]
    fn test_create_openai_embedder() {
        let config = AgentConfig::builder()
            .api_key("test")
            .embedding_dimension(256)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let embedder = create_embedder(&config).unwrap_or_else(|_| unreachable!());
        assert_eq!(embedder.name(), "openai");
        assert_eq!(embedder.dimension(), 256);
    }
}
