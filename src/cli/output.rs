//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or pretty JSON.

use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::agent::{QueryAnswer, RetrievalOutcome};
use crate::core::CollectionInfo;

/// Maximum characters of chunk text shown per result in text output.
const PREVIEW_LEN: usize = 160;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognized is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON followed by a newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"));
        out.push('\n');
        out
    }
}

/// Shortens `s` to at most `max_len` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let mut out: String = s.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}

/// Formats the collection listing.
#[must_use]
pub fn format_collections(collections: &[CollectionInfo], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if collections.is_empty() {
                return "No collections found.\n".to_string();
            }
            let mut out = String::new();
            for c in collections {
                if c.description.is_empty() {
                    let _ = writeln!(out, "{}", c.name);
                } else {
                    let _ = writeln!(out, "{}  {}", c.name, c.description);
                }
            }
            out
        }
        OutputFormat::Json => format.to_json(collections),
    }
}

fn write_run_summary(out: &mut String, outcome: &RetrievalOutcome) {
    let _ = writeln!(out, "Sub-queries:");
    for q in &outcome.sub_queries {
        let _ = writeln!(out, "  - {q}");
    }
    let _ = writeln!(
        out,
        "Rounds: {}  Chunks: {}  Tokens: {}  Stopped: {}",
        outcome.rounds,
        outcome.results.len(),
        outcome.total_tokens,
        outcome.termination
    );
    if outcome.degraded {
        let _ = writeln!(
            out,
            "Warning: {} failure(s) were skipped; results may be incomplete.",
            outcome.errors.len().max(1)
        );
    }
}

/// Formats a retrieval run: the accepted chunks and run metadata.
#[must_use]
pub fn format_retrieval(outcome: &RetrievalOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            if outcome.results.is_empty() {
                let _ = writeln!(out, "No relevant chunks found.");
            }
            for (i, r) in outcome.results.iter().enumerate() {
                let _ = writeln!(out, "[{}] {} (score {:.4})", i + 1, r.reference, r.score);
                let _ = writeln!(out, "    {}", truncate_str(&r.text.replace('\n', " "), PREVIEW_LEN));
            }
            out.push('\n');
            write_run_summary(&mut out, outcome);
            out
        }
        OutputFormat::Json => format.to_json(outcome),
    }
}

/// Formats a final answer followed by its run metadata.
#[must_use]
pub fn format_answer(answer: &QueryAnswer, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "{}", answer.answer.trim_end());
            out.push('\n');
            let mut refs: Vec<&str> = answer
                .retrieval
                .results
                .iter()
                .map(|r| r.reference.as_str())
                .collect();
            refs.dedup();
            if !refs.is_empty() {
                let _ = writeln!(out, "Sources:");
                for r in refs {
                    let _ = writeln!(out, "  - {r}");
                }
            }
            write_run_summary(&mut out, &answer.retrieval);
            out
        }
        OutputFormat::Json => format.to_json(answer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Termination;
    use crate::core::{Metadata, RetrievalResult};

    fn outcome() -> RetrievalOutcome {
        let mut outcome = RetrievalOutcome::empty(Termination::Converged);
        outcome.results.push(RetrievalResult {
            embedding: vec![0.1, 0.2],
            text: "Rust has no garbage collector".to_string(),
            reference: "rust.md".to_string(),
            metadata: Metadata::new(),
            score: 0.25,
        });
        outcome.sub_queries = vec!["Does Rust have a GC?".to_string()];
        outcome.rounds = 1;
        outcome.total_tokens = 42;
        outcome
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello", 5), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 3), "hel");
    }

    #[test]
    fn test_format_retrieval_text() {
        let text = format_retrieval(&outcome(), OutputFormat::Text);
        assert!(text.contains("[1] rust.md"));
        assert!(text.contains("Does Rust have a GC?"));
        assert!(text.contains("Tokens: 42"));
        assert!(!text.contains("Warning"));
    }

    #[test]
    fn test_format_retrieval_json_omits_embeddings() {
        let mut o = outcome();
        o.results[0].embedding.clear();
        let json: serde_json::Value =
            serde_json::from_str(&format_retrieval(&o, OutputFormat::Json)).unwrap_or_default();
        assert_eq!(json["total_tokens"], 42);
        assert!(json["results"][0].get("embedding").is_none());
    }

    #[test]
    fn test_format_degraded_warns() {
        let mut o = outcome();
        o.degraded = true;
        o.errors.push("docs: connection reset".to_string());
        assert!(format_retrieval(&o, OutputFormat::Text).contains("Warning: 1 failure(s)"));
    }

    #[test]
    fn test_format_answer_lists_sources() {
        let answer = QueryAnswer {
            answer: "No.".to_string(),
            retrieval: outcome(),
        };
        let text = format_answer(&answer, OutputFormat::Text);
        assert!(text.starts_with("No."));
        assert!(text.contains("  - rust.md"));
    }

    #[test]
    fn test_format_collections_empty() {
        assert_eq!(
            format_collections(&[], OutputFormat::Text),
            "No collections found.\n"
        );
    }
}
