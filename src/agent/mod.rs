//! LLM-driven retrieval pipeline.
//!
//! Every model interaction is an [`Agent`] with a fixed system prompt run
//! against a pluggable [`LlmProvider`]. The orchestrators combine them with
//! an [`Embedder`](crate::embedding::Embedder) and a
//! [`VectorStore`](crate::vector_db::VectorStore).
//!
//! # Architecture
//!
//! ```text
//! User query → DeepSearch
//!   ├── DecomposerAgent (≤4 sub-queries)
//!   ├── loop ≤ max_iter rounds
//!   │   ├── Fan-out → one Retriever task per gap query
//!   │   │   ├── CollectionRouter (which collections)
//!   │   │   ├── embed, search each collection
//!   │   │   └── JudgeAgent per chunk (YES / NO)
//!   │   ├── join, dedupe against everything accepted so far
//!   │   └── ReflectorAgent (≤3 gap queries, or stop)
//!   └── SynthesizerAgent → final answer (query only)
//! ```

pub mod client;
pub mod config;
pub mod decomposer;
pub mod judge;
pub mod message;
pub mod naive;
pub mod orchestrator;
pub mod outcome;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod reflector;
pub mod retriever;
pub mod router;
pub mod searcher;
pub mod synthesizer;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use client::create_provider;
pub use config::AgentConfig;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use naive::NaiveRag;
pub use orchestrator::DeepSearch;
pub use outcome::{CollectionStats, QueryAnswer, RetrievalOutcome, Termination};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use retriever::{Retriever, SubQueryResult};
pub use router::CollectionRouter;
pub use searcher::{Searcher, SearcherRouter};
pub use traits::Agent;
