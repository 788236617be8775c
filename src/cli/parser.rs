//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::embedding::DEFAULT_EMBED_BATCH_SIZE;
use crate::vector_db::DEFAULT_DB_PATH;

/// deepsearch: iterative multi-hop retrieval over local vector collections.
///
/// Breaks a question into sub-queries, searches the relevant collections,
/// filters chunks with an LLM judge and keeps searching until the gaps
/// are closed.
#[derive(Parser, Debug)]
#[command(name = "deepsearch")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the vector database file.
    ///
    /// Defaults to `.deepsearch/vectors.db` in the current directory.
    #[arg(short, long, env = "DEEPSEARCH_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Directory containing prompt template files.
    #[arg(long, global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed and insert pre-chunked records into a collection.
    ///
    /// Each line of the input is a JSON object with `text`, `reference`
    /// and an optional `metadata` object.
    #[command(after_help = r#"Examples:
  deepsearch load docs.jsonl                                # Default collection
  deepsearch load rust.jsonl -c rust -D "Rust language docs"
  deepsearch load rust.jsonl -c rust --force                # Recreate collection

Input format (one record per line):
  {"text": "Ownership rules...", "reference": "book/ch04.md", "metadata": {"page": 3}}"#)]
    Load {
        /// Path to the JSONL file.
        file: PathBuf,

        /// Target collection (defaults to the configured default collection).
        #[arg(short, long)]
        collection: Option<String>,

        /// Collection description shown to the collection router.
        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// Drop and recreate the collection before inserting.
        #[arg(short, long)]
        force: bool,

        /// Texts per embedding request.
        #[arg(long, default_value_t = DEFAULT_EMBED_BATCH_SIZE)]
        batch_size: usize,
    },

    /// List collections matching the configured embedding dimension.
    #[command(alias = "ls")]
    Collections,

    /// Drop a collection and all of its chunks.
    #[command(alias = "rm")]
    Clear {
        /// Collection name.
        collection: String,
    },

    /// Retrieve relevant chunks without writing an answer.
    #[command(after_help = r#"Examples:
  deepsearch retrieve "How does borrowing interact with closures?"
  deepsearch retrieve "What is a trait object?" --naive
  deepsearch --format json retrieve "async cancellation" | jq '.results[].reference'"#)]
    Retrieve {
        /// Question to research.
        query: String,

        /// Maximum search/reflect rounds.
        #[arg(long)]
        max_iter: Option<usize>,

        /// Single-pass retrieval without decomposition or judging.
        #[arg(long)]
        naive: bool,
    },

    /// Retrieve relevant chunks and write a final answer.
    #[command(after_help = r#"Examples:
  deepsearch query "Compare Rust and Go error handling"
  deepsearch query "What is the default edition?" --naive
  deepsearch query "Explain pinning" --auto          # Let the model pick the searcher"#)]
    Query {
        /// Question to answer.
        query: String,

        /// Maximum search/reflect rounds.
        #[arg(long)]
        max_iter: Option<usize>,

        /// Single-pass retrieval without decomposition or judging.
        #[arg(long, conflicts_with = "auto")]
        naive: bool,

        /// Let the searcher router choose between deep and naive search.
        #[arg(long)]
        auto: bool,
    },

    /// Write default prompt templates to disk for customization.
    ///
    /// Existing files are left untouched.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  deepsearch init-prompts                 # Write to ~/.config/deepsearch/prompts/
  deepsearch init-prompts ./my-prompts    # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/deepsearch/prompts/`.
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(db_path: Option<PathBuf>) -> Cli {
        Cli {
            db_path,
            verbose: false,
            format: "text".to_string(),
            prompt_dir: None,
            command: Commands::Collections,
        }
    }

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        assert_eq!(cli(None).get_db_path(), PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn test_custom_db_path() {
        let cli = cli(Some(PathBuf::from("/custom/path.db")));
        assert_eq!(cli.get_db_path(), PathBuf::from("/custom/path.db"));
    }

    #[test]
    fn test_parse_query_flags() {
        let cli = Cli::try_parse_from(["deepsearch", "query", "what is rust", "--max-iter", "2", "--auto"])
            .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Query {
                query,
                max_iter,
                naive,
                auto,
            } => {
                assert_eq!(query, "what is rust");
                assert_eq!(max_iter, Some(2));
                assert!(!naive);
                assert!(auto);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_naive_conflicts_with_auto() {
        let result = Cli::try_parse_from(["deepsearch", "query", "q", "--naive", "--auto"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_load_defaults() {
        let cli = Cli::try_parse_from(["deepsearch", "--format", "json", "load", "docs.jsonl"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Load {
                file,
                collection,
                force,
                batch_size,
                ..
            } => {
                assert_eq!(file, PathBuf::from("docs.jsonl"));
                assert!(collection.is_none());
                assert!(!force);
                assert_eq!(batch_size, DEFAULT_EMBED_BATCH_SIZE);
            }
            _ => unreachable!(),
        }
    }
}
