//! # deepsearch
//!
//! Iterative multi-hop retrieval over local vector collections.
//!
//! A question is decomposed into sub-queries, each sub-query is routed to
//! the collections that may answer it, retrieved chunks are filtered by an
//! LLM relevance judge, and a reflection step proposes gap queries until
//! the model is satisfied or the round cap is reached.
//!
//! ## Modules
//!
//! - [`core`]: Response parsing, relevance verdicts, retrieval results and
//!   deduplication
//! - [`agent`]: LLM agents, collection routing, fan-out and the reflection loop
//! - [`embedding`]: Embedding adapters
//! - [`vector_db`]: Vector store adapters
//! - [`cli`]: Command-line interface
//! - [`error`]: Error types

pub mod agent;
pub mod cli;
pub mod core;
pub mod embedding;
pub mod error;
pub mod vector_db;

pub use agent::{AgentConfig, DeepSearch, NaiveRag, QueryAnswer, RetrievalOutcome, Searcher};
pub use crate::core::{CollectionInfo, RetrievalResult};
pub use error::{AgentError, Error, Result};
