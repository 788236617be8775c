//! Error types for deepsearch.
//!
//! [`AgentError`] covers the retrieval pipeline and its adapters,
//! [`StorageError`] the SQLite vector store, and [`CommandError`] the CLI.
//! All of them convert into the top-level [`Error`].

use thiserror::Error;

use crate::core::ParseError;

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Retrieval pipeline failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Vector store persistence failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the retrieval pipeline and its adapters.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured.
    #[error("API key missing: set OPENAI_API_KEY or DEEPSEARCH_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name has no implementation.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// Chat completion transport or API failure.
    #[error("chat request failed: {message}")]
    ApiRequest {
        /// Error description.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// Embedding call failed.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Error description.
        message: String,
    },

    /// A vector store operation failed for one collection.
    #[error("vector store error on collection '{collection}': {message}")]
    VectorStore {
        /// Collection the operation targeted.
        collection: String,
        /// Error description.
        message: String,
    },

    /// LLM output could not be interpreted.
    #[error("{message}")]
    ResponseParse {
        /// Error description.
        message: String,
        /// The offending model output.
        content: String,
    },

    /// Invalid configuration (unknown collection, dimension mismatch, ...).
    #[error("configuration error: {message}")]
    Configuration {
        /// Error description.
        message: String,
    },

    /// Internal orchestration failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Error description.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` for failures the orchestrator absorbs at the
    /// granularity of one sub-query or one collection.
    ///
    /// Embedding and vector-store failures degrade a single contribution
    /// to a round. Chat, parse, and configuration failures block forward
    /// progress and must reach the caller.
    #[must_use]
    pub const fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Embedding { .. } | Self::VectorStore { .. } | Self::Orchestration { .. }
        )
    }
}

impl From<ParseError> for AgentError {
    fn from(err: ParseError) -> Self {
        Self::ResponseParse {
            message: err.to_string(),
            content: err.content,
        }
    }
}

/// Errors raised by the SQLite vector store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Metadata (de)serialization failure.
    #[error("metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A vector does not match the collection dimension.
    #[error("dimension mismatch on '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Collection name.
        collection: String,
        /// Collection dimension.
        expected: usize,
        /// Offending vector length.
        actual: usize,
    },

    /// Filesystem failure while preparing the database path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Maps a storage failure onto the pipeline taxonomy.
    ///
    /// Unknown collections and dimension mismatches are configuration
    /// errors; everything else is a per-collection store failure.
    #[must_use]
    pub fn into_agent_error(self, collection: &str) -> AgentError {
        match self {
            Self::DimensionMismatch { .. } | Self::CollectionNotFound(_) => {
                AgentError::Configuration {
                    message: self.to_string(),
                }
            }
            other => AgentError::VectorStore {
                collection: collection.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Invalid input file or arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The command failed while running.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradable_classification() {
        assert!(
            AgentError::Embedding {
                message: "timeout".to_string()
            }
            .is_degradable()
        );
        assert!(
            AgentError::VectorStore {
                collection: "docs".to_string(),
                message: "down".to_string()
            }
            .is_degradable()
        );
        assert!(
            !AgentError::ApiRequest {
                message: "401".to_string(),
                status: Some(401)
            }
            .is_degradable()
        );
        assert!(
            !AgentError::Configuration {
                message: "bad".to_string()
            }
            .is_degradable()
        );
    }

    #[test]
    fn test_parse_error_conversion_keeps_content() {
        let err = ParseError::new("no list found", "hello there");
        let agent: AgentError = err.into();
        match agent {
            AgentError::ResponseParse { content, .. } => assert_eq!(content, "hello there"),
            other => unreachable!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_dimension_mismatch_is_configuration() {
        let err = StorageError::DimensionMismatch {
            collection: "docs".to_string(),
            expected: 4,
            actual: 3,
        };
        assert!(matches!(
            err.into_agent_error("docs"),
            AgentError::Configuration { .. }
        ));
    }

    #[test]
    fn test_missing_collection_is_configuration() {
        let err = StorageError::CollectionNotFound("docs".to_string());
        let agent = err.into_agent_error("docs");
        assert!(matches!(agent, AgentError::Configuration { .. }));
        assert!(!agent.is_degradable());
        assert!(agent.to_string().contains("docs"));
    }

    #[test]
    fn test_database_failure_is_degradable() {
        let err = StorageError::Database(rusqlite::Error::InvalidQuery);
        let agent = err.into_agent_error("docs");
        assert!(matches!(agent, AgentError::VectorStore { collection, .. } if collection == "docs"));
    }
}
