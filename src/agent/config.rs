//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The resulting [`AgentConfig`] is built once and handed to every component
//! by reference.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
/// Default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default embedding dimension.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
/// Default maximum search/reflect rounds.
const DEFAULT_MAX_ITER: usize = 3;
/// Default results per collection for each sub-query search.
const DEFAULT_SEARCH_TOP_K: usize = 3;
/// Default total results for the naive searcher (split across collections).
const DEFAULT_NAIVE_TOP_K: usize = 10;
/// Default maximum concurrent fan-out tasks per round.
const DEFAULT_MAX_CONCURRENCY: usize = 8;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "deepsearch";

/// Configuration for the retrieval pipeline and its adapters.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used for every chat call.
    pub chat_model: String,
    /// Embedding provider name.
    pub embedding_provider: String,
    /// Embedding model.
    pub embedding_model: String,
    /// Embedding vector dimension; collections of other dimensions are ignored.
    pub embedding_dimension: usize,
    /// Hard cap on search/reflect rounds.
    pub max_iter: usize,
    /// Results requested per collection for each sub-query.
    pub search_top_k: usize,
    /// Total results for the naive searcher.
    pub naive_top_k: usize,
    /// Ask the LLM which collections to search instead of searching all.
    pub route_collections: bool,
    /// Render chunks from their `wider_text` metadata in the final summary.
    pub text_window: bool,
    /// Maximum concurrent fan-out tasks in one round.
    pub max_concurrency: usize,
    /// Collection used when none is named explicitly.
    pub default_collection: String,
    /// Request timeout applied by the adapters.
    pub timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, prompts are loaded from markdown files in this directory,
    /// falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    chat_model: Option<String>,
    embedding_provider: Option<String>,
    embedding_model: Option<String>,
    embedding_dimension: Option<usize>,
    max_iter: Option<usize>,
    search_top_k: Option<usize>,
    naive_top_k: Option<usize>,
    route_collections: Option<bool>,
    text_window: Option<bool>,
    max_concurrency: Option<usize>,
    default_collection: Option<String>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Embedding dimension from `DEEPSEARCH_EMBEDDING_DIM`, or the default.
///
/// Needs no API key, so storage-only commands can filter by dimension.
#[must_use]
pub fn env_embedding_dimension() -> usize {
    env_parse("DEEPSEARCH_EMBEDDING_DIM").unwrap_or(DEFAULT_EMBEDDING_DIMENSION)
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("DEEPSEARCH_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("DEEPSEARCH_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("DEEPSEARCH_BASE_URL"))
                .ok();
        }
        if self.chat_model.is_none() {
            self.chat_model = std::env::var("DEEPSEARCH_CHAT_MODEL").ok();
        }
        if self.embedding_model.is_none() {
            self.embedding_model = std::env::var("DEEPSEARCH_EMBEDDING_MODEL").ok();
        }
        if self.embedding_dimension.is_none() {
            self.embedding_dimension = env_parse("DEEPSEARCH_EMBEDDING_DIM");
        }
        if self.max_iter.is_none() {
            self.max_iter = env_parse("DEEPSEARCH_MAX_ITER");
        }
        if self.search_top_k.is_none() {
            self.search_top_k = env_parse("DEEPSEARCH_TOP_K");
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = env_parse("DEEPSEARCH_MAX_CONCURRENCY");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("DEEPSEARCH_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    /// Sets the embedding provider name.
    #[must_use]
    pub fn embedding_provider(mut self, provider: impl Into<String>) -> Self {
        self.embedding_provider = Some(provider.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets the embedding dimension.
    #[must_use]
    pub const fn embedding_dimension(mut self, dim: usize) -> Self {
        self.embedding_dimension = Some(dim);
        self
    }

    /// Sets the maximum number of search/reflect rounds.
    #[must_use]
    pub const fn max_iter(mut self, n: usize) -> Self {
        self.max_iter = Some(n);
        self
    }

    /// Sets the per-collection search top-k.
    #[must_use]
    pub const fn search_top_k(mut self, n: usize) -> Self {
        self.search_top_k = Some(n);
        self
    }

    /// Sets the naive searcher's total top-k.
    #[must_use]
    pub const fn naive_top_k(mut self, n: usize) -> Self {
        self.naive_top_k = Some(n);
        self
    }

    /// Enables or disables LLM collection routing.
    #[must_use]
    pub const fn route_collections(mut self, enabled: bool) -> Self {
        self.route_collections = Some(enabled);
        self
    }

    /// Enables or disables `wider_text` rendering in summaries.
    #[must_use]
    pub const fn text_window(mut self, enabled: bool) -> Self {
        self.text_window = Some(enabled);
        self
    }

    /// Sets the maximum concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the default collection name.
    #[must_use]
    pub fn default_collection(mut self, name: impl Into<String>) -> Self {
        self.default_collection = Some(name.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::Configuration`] for a zero dimension, round cap, or
    /// concurrency.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let config = AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            chat_model: self
                .chat_model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_provider: self
                .embedding_provider
                .unwrap_or_else(|| "openai".to_string()),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: self
                .embedding_dimension
                .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            max_iter: self.max_iter.unwrap_or(DEFAULT_MAX_ITER),
            search_top_k: self.search_top_k.unwrap_or(DEFAULT_SEARCH_TOP_K),
            naive_top_k: self.naive_top_k.unwrap_or(DEFAULT_NAIVE_TOP_K),
            route_collections: self.route_collections.unwrap_or(true),
            text_window: self.text_window.unwrap_or(true),
            max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            default_collection: self
                .default_collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
        };

        for (name, value) in [
            ("embedding_dimension", config.embedding_dimension),
            ("max_iter", config.max_iter),
            ("max_concurrency", config.max_concurrency),
        ] {
            if value == 0 {
                return Err(AgentError::Configuration {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }

        Ok(config)
    }
}
