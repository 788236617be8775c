//! CLI command implementations.
//!
//! Each command is synchronous at the boundary and drives the async
//! pipeline on a private tokio runtime.

#![allow(clippy::uninlined_format_args)]

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::agent::config::{DEFAULT_COLLECTION, env_embedding_dimension};
use crate::agent::{
    AgentConfig, DeepSearch, NaiveRag, PromptSet, RetrievalOutcome, Searcher, SearcherRouter,
    create_provider,
};
use crate::cli::output::{OutputFormat, format_answer, format_collections, format_retrieval};
use crate::cli::parser::{Cli, Commands};
use crate::embedding::{create_embedder, embed_in_batches};
use crate::error::{CommandError, Result};
use crate::vector_db::{Chunk, SqliteVectorStore, VectorStore};

/// Which searcher answers a retrieve or query command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Decompose, judge and reflect.
    Deep,
    /// Single pass, no judging.
    Naive,
    /// Let the searcher router pick.
    Auto,
}

impl SearchMode {
    const fn from_flags(naive: bool, auto: bool) -> Self {
        if naive {
            Self::Naive
        } else if auto {
            Self::Auto
        } else {
            Self::Deep
        }
    }
}

/// Parameters for the load command.
#[derive(Debug, Clone)]
pub struct LoadParams<'a> {
    /// JSONL input file.
    pub file: &'a Path,
    /// Target collection; the configured default when `None`.
    pub collection: Option<&'a str>,
    /// Collection description for routing.
    pub description: &'a str,
    /// Recreate the collection first.
    pub force: bool,
    /// Texts per embedding request.
    pub batch_size: usize,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();
    let prompt_dir = cli.prompt_dir.as_deref();

    match &cli.command {
        Commands::Load {
            file,
            collection,
            description,
            force,
            batch_size,
        } => {
            let params = LoadParams {
                file,
                collection: collection.as_deref(),
                description,
                force: *force,
                batch_size: *batch_size,
            };
            cmd_load(&db_path, &params, prompt_dir, format)
        }
        Commands::Collections => cmd_collections(&db_path, format),
        Commands::Clear { collection } => cmd_clear(&db_path, collection, format),
        Commands::Retrieve {
            query,
            max_iter,
            naive,
        } => cmd_retrieve(
            &db_path,
            query,
            *max_iter,
            SearchMode::from_flags(*naive, false),
            prompt_dir,
            format,
        ),
        Commands::Query {
            query,
            max_iter,
            naive,
            auto,
        } => cmd_query(
            &db_path,
            query,
            *max_iter,
            SearchMode::from_flags(*naive, *auto),
            prompt_dir,
            format,
        ),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn open_store(db_path: &Path, default_collection: &str) -> Result<SqliteVectorStore> {
    Ok(SqliteVectorStore::open(db_path, default_collection)?)
}

fn load_config(prompt_dir: Option<&Path>) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

/// Parses pre-chunked JSONL records. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`CommandError::InvalidInput`] naming the first bad line.
pub fn parse_jsonl(content: &str) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(line)
            .map_err(|e| CommandError::InvalidInput(format!("line {}: {e}", idx + 1)))?;
        if chunk.text.trim().is_empty() {
            return Err(
                CommandError::InvalidInput(format!("line {}: empty text", idx + 1)).into(),
            );
        }
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn cmd_load(
    db_path: &Path,
    params: &LoadParams<'_>,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let content = std::fs::read_to_string(params.file)?;
    let mut chunks = parse_jsonl(&content)?;
    if chunks.is_empty() {
        return Err(CommandError::InvalidInput(format!(
            "no records in {}",
            params.file.display()
        ))
        .into());
    }

    let config = load_config(prompt_dir)?;
    let embedder = create_embedder(&config)?;
    let collection = params
        .collection
        .unwrap_or(&config.default_collection)
        .to_string();
    let store = open_store(db_path, &config.default_collection)?;

    let rt = runtime()?;
    let inserted = rt
        .block_on(async {
            store
                .init_collection(
                    embedder.dimension(),
                    &collection,
                    params.description,
                    params.force,
                )
                .await?;
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = embed_in_batches(&*embedder, &texts, params.batch_size).await?;
            for (chunk, vector) in chunks.iter_mut().zip(vectors) {
                chunk.embedding = vector;
            }
            store.insert(&collection, &chunks).await
        })
        .map_err(|e| CommandError::ExecutionFailed(format!("Load failed: {e}")))?;

    info!(collection = %collection, inserted, "loaded chunks");

    match format {
        OutputFormat::Text => Ok(format!(
            "Loaded {} chunk(s) into '{}' from {}\n",
            inserted,
            collection,
            params.file.display()
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "collection": collection,
            "inserted": inserted,
            "source": params.file.to_string_lossy(),
        }))),
    }
}

fn cmd_collections(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = open_store(db_path, DEFAULT_COLLECTION)?;
    let rt = runtime()?;
    let collections = rt.block_on(store.list_collections(Some(env_embedding_dimension())))?;
    Ok(format_collections(&collections, format))
}

fn cmd_clear(db_path: &Path, collection: &str, format: OutputFormat) -> Result<String> {
    let store = open_store(db_path, DEFAULT_COLLECTION)?;
    let rt = runtime()?;
    let removed = rt.block_on(store.clear(collection))?;

    match format {
        OutputFormat::Text => Ok(if removed {
            format!("Dropped collection '{collection}'\n")
        } else {
            format!("Collection '{collection}' not found\n")
        }),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "collection": collection,
            "removed": removed,
        }))),
    }
}

/// Wires adapters and builds the searcher for `mode`.
fn build_searcher(
    db_path: &Path,
    config: &AgentConfig,
    mode: SearchMode,
) -> Result<Box<dyn Searcher>> {
    let provider = create_provider(config)?;
    let embedder = create_embedder(config)?;
    let store: Arc<dyn VectorStore> = Arc::new(open_store(db_path, &config.default_collection)?);
    let prompts = PromptSet::load(config.prompt_dir.as_deref());

    let deep = || {
        DeepSearch::with_prompts(
            Arc::clone(&provider),
            Arc::clone(&embedder),
            Arc::clone(&store),
            config.clone(),
            prompts.clone(),
        )
    };
    let naive = || {
        NaiveRag::new(
            Arc::clone(&provider),
            Arc::clone(&embedder),
            Arc::clone(&store),
            config,
            &prompts,
        )
    };

    Ok(match mode {
        SearchMode::Deep => Box::new(deep()),
        SearchMode::Naive => Box::new(naive()),
        SearchMode::Auto => {
            let searchers: Vec<Box<dyn Searcher>> = vec![Box::new(deep()), Box::new(naive())];
            Box::new(SearcherRouter::new(
                Arc::clone(&provider),
                searchers,
                config,
                prompts.route_searchers.clone(),
            )?)
        }
    })
}

fn strip_embeddings(outcome: &mut RetrievalOutcome) {
    for result in &mut outcome.results {
        result.embedding = Vec::new();
    }
}

fn cmd_retrieve(
    db_path: &Path,
    query: &str,
    max_iter: Option<usize>,
    mode: SearchMode,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let config = load_config(prompt_dir)?;
    let searcher = build_searcher(db_path, &config, mode)?;

    let rt = runtime()?;
    let mut outcome = rt
        .block_on(searcher.retrieve(query, max_iter))
        .map_err(|e| CommandError::ExecutionFailed(format!("Retrieval failed: {e}")))?;

    info!(
        searcher = searcher.name(),
        chunks = outcome.results.len(),
        tokens = outcome.total_tokens,
        "retrieval finished"
    );
    strip_embeddings(&mut outcome);
    Ok(format_retrieval(&outcome, format))
}

fn cmd_query(
    db_path: &Path,
    query: &str,
    max_iter: Option<usize>,
    mode: SearchMode,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let config = load_config(prompt_dir)?;
    let searcher = build_searcher(db_path, &config, mode)?;

    let rt = runtime()?;
    let mut answer = rt
        .block_on(searcher.query(query, max_iter))
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;

    info!(
        searcher = searcher.name(),
        chunks = answer.retrieval.results.len(),
        tokens = answer.total_tokens(),
        "query finished"
    );
    strip_embeddings(&mut answer.retrieval);
    Ok(format_answer(&answer, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize the system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>(),
            "count": written.len(),
        }))),
    }
}
