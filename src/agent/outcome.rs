//! Result types for retrieval runs.
//!
//! A [`RetrievalOutcome`] is everything one `retrieve` call produced: the
//! accepted chunks, the sub-query history, token accounting, and enough
//! bookkeeping to tell a complete run from a degraded one.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::core::RetrievalResult;

/// Per-collection search statistics accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// Searches issued against the collection.
    pub searches: usize,
    /// Chunks returned by those searches.
    pub hits: usize,
    /// Chunks the judge accepted.
    pub accepted: usize,
    /// Searches that failed and were skipped.
    pub failures: usize,
}

impl CollectionStats {
    /// Adds another set of counters into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.searches += other.searches;
        self.hits += other.hits;
        self.accepted += other.accepted;
        self.failures += other.failures;
    }
}

/// Merges per-collection statistics from `from` into `into`.
pub fn merge_stats(
    into: &mut BTreeMap<String, CollectionStats>,
    from: &BTreeMap<String, CollectionStats>,
) {
    for (name, stats) in from {
        into.entry(name.clone()).or_default().merge(stats);
    }
}

/// Why the iteration loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Decomposition produced no sub-queries.
    EmptyDecomposition,
    /// Reflection returned no gap queries.
    Converged,
    /// The round cap was reached.
    MaxIterations,
    /// The reflection reply could not be parsed.
    ReflectionUnparseable,
    /// No iterative loop ran (single-shot searcher).
    SingleShot,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EmptyDecomposition => "empty decomposition",
            Self::Converged => "no further queries",
            Self::MaxIterations => "round limit reached",
            Self::ReflectionUnparseable => "unparseable reflection",
            Self::SingleShot => "single shot",
        };
        f.write_str(s)
    }
}

/// Final state of one retrieval call.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    /// Accepted chunks, deduplicated by text, in acceptance order.
    pub results: Vec<RetrievalResult>,
    /// Every sub-query searched, in generation order.
    pub sub_queries: Vec<String>,
    /// Sum of `total_tokens` over every chat call in the run.
    pub total_tokens: u64,
    /// SEARCH rounds executed.
    pub rounds: usize,
    /// Why the loop stopped.
    pub termination: Termination,
    /// Per-collection search statistics.
    pub stats: BTreeMap<String, CollectionStats>,
    /// Fan-out tasks that failed and contributed nothing.
    pub failed_tasks: usize,
    /// Reflection replies that could not be parsed.
    pub reflection_parse_failures: usize,
    /// Messages from absorbed failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Set when any failure was absorbed; the result set may be incomplete.
    pub degraded: bool,
    /// Wall-clock time of the run.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl RetrievalOutcome {
    /// An outcome with no results, as returned before any search ran.
    #[must_use]
    pub const fn empty(termination: Termination) -> Self {
        Self {
            results: Vec::new(),
            sub_queries: Vec::new(),
            total_tokens: 0,
            rounds: 0,
            termination,
            stats: BTreeMap::new(),
            failed_tasks: 0,
            reflection_parse_failures: 0,
            errors: Vec::new(),
            degraded: false,
            elapsed: Duration::ZERO,
        }
    }
}

/// Answer produced by a searcher's `query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    /// Final answer text.
    pub answer: String,
    /// The retrieval run the answer was written from.
    #[serde(flatten)]
    pub retrieval: RetrievalOutcome,
}

impl QueryAnswer {
    /// Total tokens including the summary call.
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.retrieval.total_tokens
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}
