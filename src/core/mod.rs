//! Pure building blocks of the retrieval pipeline.
//!
//! Nothing in this module performs I/O: it holds the retrieval data model,
//! the result deduplicator, the lenient list parser for LLM output, and
//! the binary relevance verdict.

pub mod parser;
pub mod relevance;
pub mod result;

pub use parser::{ParseError, parse_list, strip_reasoning};
pub use relevance::Verdict;
pub use result::{CollectionInfo, Metadata, RetrievalResult, WIDER_TEXT_KEY, dedupe, dedupe_into};
