//! `SQLite`-backed vector store.
//!
//! Vectors are stored as little-endian `f32` blobs next to their chunk text
//! and JSON metadata. Search is a brute-force L2 scan over one collection;
//! the score is the Euclidean distance, so smaller is closer.
//!
//! rusqlite is synchronous, so every trait method runs its query on the
//! blocking thread pool.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::{Chunk, VectorStore};
use crate::core::{CollectionInfo, Metadata, RetrievalResult};
use crate::error::{AgentError, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS collections (
    name        TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    dim         INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS chunks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    collection  TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
    text        TEXT NOT NULL,
    reference   TEXT NOT NULL,
    metadata    TEXT NOT NULL DEFAULT '{}',
    embedding   BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection);
";

/// Vector store over a single `SQLite` database file.
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    default_collection: String,
}

impl SqliteVectorStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the parent directory cannot be created or
    /// the schema cannot be applied.
    pub fn open(path: &Path, default_collection: impl Into<String>) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened vector store");
        Self::with_connection(conn, default_collection.into())
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the schema cannot be applied.
    pub fn open_in_memory(default_collection: impl Into<String>) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?, default_collection.into())
    }

    fn with_connection(conn: Connection, default_collection: String) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            default_collection,
        })
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, collection: &str, op: F) -> Result<T, AgentError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut *guard)
        })
        .await
        .map_err(|e| AgentError::VectorStore {
            collection: collection.to_string(),
            message: format!("blocking task failed: {e}"),
        })?
        .map_err(|e| e.into_agent_error(collection))
    }

    fn collection_dim(conn: &Connection, collection: &str) -> Result<Option<usize>, StorageError> {
        let dim: Option<i64> = conn
            .query_row(
                "SELECT dim FROM collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;
        Ok(dim.and_then(|d| usize::try_from(d).ok()))
    }

    fn init_collection_sync(
        conn: &mut Connection,
        dim: usize,
        collection: &str,
        description: &str,
        force_new: bool,
    ) -> Result<(), StorageError> {
        let tx = conn.transaction()?;

        if force_new {
            let dropped = tx.execute("DELETE FROM collections WHERE name = ?1", params![collection])?;
            if dropped > 0 {
                info!(collection, "dropped existing collection");
            }
        }

        match Self::collection_dim(&tx, collection)? {
            Some(existing) if existing != dim => {
                return Err(StorageError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: existing,
                    actual: dim,
                });
            }
            Some(_) => {
                debug!(collection, "collection already exists");
            }
            None => {
                tx.execute(
                    "INSERT INTO collections (name, description, dim) VALUES (?1, ?2, ?3)",
                    params![collection, description, i64::try_from(dim).unwrap_or(i64::MAX)],
                )?;
                info!(collection, dim, "created collection");
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn insert_sync(
        conn: &mut Connection,
        collection: &str,
        chunks: &[Chunk],
    ) -> Result<usize, StorageError> {
        let dim = Self::collection_dim(conn, collection)?
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;

        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dim) {
            return Err(StorageError::DimensionMismatch {
                collection: collection.to_string(),
                expected: dim,
                actual: bad.embedding.len(),
            });
        }

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (collection, text, reference, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for chunk in chunks {
                let metadata = serde_json::to_string(&chunk.metadata)?;
                stmt.execute(params![
                    collection,
                    chunk.text,
                    chunk.reference,
                    metadata,
                    f32_vec_to_bytes(&chunk.embedding)
                ])?;
            }
        }
        tx.commit()?;
        Ok(chunks.len())
    }

    fn search_sync(
        conn: &Connection,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, StorageError> {
        let dim = Self::collection_dim(conn, collection)?
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;
        if vector.len() != dim {
            return Err(StorageError::DimensionMismatch {
                collection: collection.to_string(),
                expected: dim,
                actual: vector.len(),
            });
        }

        let mut stmt = conn.prepare(
            "SELECT text, reference, metadata, embedding FROM chunks WHERE collection = ?1",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (text, reference, metadata, blob) = row?;
            let embedding = bytes_to_f32_vec(&blob);
            let score = l2_distance(vector, &embedding);
            let metadata: Metadata = serde_json::from_str(&metadata)?;
            scored.push(RetrievalResult {
                embedding,
                text,
                reference,
                metadata,
                score,
            });
        }

        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn list_collections_sync(
        conn: &Connection,
        dim: Option<usize>,
    ) -> Result<Vec<CollectionInfo>, StorageError> {
        let mut stmt = conn.prepare("SELECT name, description, dim FROM collections ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut collections = Vec::new();
        for row in rows {
            let (name, description, stored_dim) = row?;
            let matches = dim.is_none_or(|d| usize::try_from(stored_dim).is_ok_and(|s| s == d));
            if matches {
                collections.push(CollectionInfo { name, description });
            }
        }
        Ok(collections)
    }

    fn clear_sync(conn: &Connection, collection: &str) -> Result<bool, StorageError> {
        let removed = conn.execute("DELETE FROM collections WHERE name = ?1", params![collection])?;
        Ok(removed > 0)
    }
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("default_collection", &self.default_collection)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn default_collection(&self) -> &str {
        &self.default_collection
    }

    async fn init_collection(
        &self,
        dim: usize,
        collection: &str,
        description: &str,
        force_new: bool,
    ) -> Result<(), AgentError> {
        let name = collection.to_string();
        let description = description.to_string();
        self.blocking(collection, move |conn| {
            Self::init_collection_sync(conn, dim, &name, &description, force_new)
        })
        .await
    }

    async fn insert(&self, collection: &str, chunks: &[Chunk]) -> Result<usize, AgentError> {
        let name = collection.to_string();
        let chunks = chunks.to_vec();
        self.blocking(collection, move |conn| Self::insert_sync(conn, &name, &chunks))
            .await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, AgentError> {
        let name = collection.to_string();
        let vector = vector.to_vec();
        self.blocking(collection, move |conn| {
            Self::search_sync(conn, &name, &vector, top_k)
        })
        .await
    }

    async fn list_collections(
        &self,
        dim: Option<usize>,
    ) -> Result<Vec<CollectionInfo>, AgentError> {
        self.blocking("*", move |conn| Self::list_collections_sync(conn, dim))
            .await
    }

    async fn clear(&self, collection: &str) -> Result<bool, AgentError> {
        let name = collection.to_string();
        self.blocking(collection, move |conn| Self::clear_sync(conn, &name))
            .await
    }
}

fn f32_vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
