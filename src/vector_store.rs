//! Persistent chunk store with brute-force cosine similarity search.
//!
//! Rows live in a single SQLite table inside the data directory. Every ingestion replaces the
//! whole table inside one transaction, so readers see either the previous corpus or the new one.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use crate::embeddings::EmbeddedChunkRecord;
use crate::error::{RagError, Result};

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "docqa.sqlite3";

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    /// Stored chunk text.
    pub text: String,
    /// File the chunk was ingested from.
    pub filename: String,
    /// Sequential chunk position.
    pub chunk_id: usize,
    /// Estimated page.
    pub page: usize,
    /// Cosine similarity to the query vector.
    pub score: f32,
}

/// SQLite-backed vector store holding the chunks of the current document.
pub struct ChunkStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl ChunkStore {
    /// Opens (or creates) the store inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(DATABASE_FILE);
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                chunk_id INTEGER NOT NULL,
                page INTEGER NOT NULL,
                filename TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                dimensions INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_filename ON chunks(filename);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Path of the SQLite file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RagError::Lock("chunk store"))
    }

    /// Deletes every stored row and inserts `records` in their place.
    pub fn replace_all(&self, records: &[EmbeddedChunkRecord]) -> Result<()> {
        if let Some(first) = records.first() {
            let expected = first.embedding.len();
            if expected == 0 {
                return Err(RagError::InvalidInput("empty embedding vector".to_string()));
            }
            if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM chunks", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO chunks (id, chunk_id, page, filename, content, embedding, dimensions) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for record in records {
                insert.execute(params![
                    record.store_id(),
                    record.chunk_id as i64,
                    record.page as i64,
                    record.filename,
                    record.text,
                    serialize_embedding(&record.embedding),
                    record.embedding.len() as i64,
                ])?;
            }
        }
        tx.commit()?;
        debug!(removed, inserted = records.len(), "replaced stored chunks");
        Ok(())
    }

    /// Returns up to `limit` chunks ordered by descending cosine similarity.
    pub fn query(&self, embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        if limit == 0 || embedding.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT content, filename, chunk_id, page, embedding, dimensions FROM chunks",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut scored: Vec<ScoredChunk> = rows
            .into_iter()
            .filter(|(.., dimensions)| *dimensions as usize == embedding.len())
            .map(|(text, filename, chunk_id, page, blob, _)| {
                let stored = deserialize_embedding(&blob);
                ScoredChunk {
                    text,
                    filename,
                    chunk_id: chunk_id.max(0) as usize,
                    page: page.max(0) as usize,
                    score: cosine_similarity(embedding, &stored),
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    /// Number of stored chunks.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    /// Distinct filenames present in stored chunk metadata.
    pub fn filenames(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT filename FROM chunks ORDER BY filename")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Whether any stored chunk came from `filename`.
    pub fn has_filename(&self, filename: &str) -> Result<bool> {
        let conn = self.lock()?;
        let found: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM chunks WHERE filename = ?1)",
            params![filename],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    /// Deletes every stored chunk, returning how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM chunks", [])?;
        Ok(removed)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity; zero for empty, mismatched, or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::Chunk;
    use pretty_assertions::assert_eq;

    fn record(filename: &str, chunk_id: usize, embedding: Vec<f32>) -> EmbeddedChunkRecord {
        EmbeddedChunkRecord::new(
            filename,
            Chunk {
                chunk_id,
                page: chunk_id / 3,
                text: format!("text {chunk_id}"),
            },
            embedding,
        )
    }

    fn open_temp() -> (tempfile::TempDir, ChunkStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ChunkStore::open(dir.path()).expect("open store");
        (dir, store)
    }

    #[test]
    fn cosine_similarity_bounds() {
        let a = [1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[1.0, 0.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn embedding_blob_round_trips() {
        let values = vec![1.5f32, -2.0, 0.25];
        assert_eq!(deserialize_embedding(&serialize_embedding(&values)), values);
    }

    #[test]
    fn replace_all_drops_previous_document() {
        let (_dir, store) = open_temp();
        store
            .replace_all(&[
                record("a.pdf", 0, vec![1.0, 0.0]),
                record("a.pdf", 1, vec![0.0, 1.0]),
                record("a.pdf", 2, vec![1.0, 1.0]),
            ])
            .expect("first ingest");
        assert_eq!(store.count().expect("count"), 3);

        store
            .replace_all(&[record("b.pdf", 0, vec![1.0, 0.0])])
            .expect("second ingest");
        assert_eq!(store.count().expect("count"), 1);
        assert!(!store.has_filename("a.pdf").expect("lookup"));
        assert!(store.has_filename("b.pdf").expect("lookup"));
        assert_eq!(store.filenames().expect("names"), vec!["b.pdf".to_string()]);
    }

    #[test]
    fn query_ranks_by_similarity_and_caps_results() {
        let (_dir, store) = open_temp();
        store
            .replace_all(&[
                record("a.pdf", 0, vec![0.0, 1.0]),
                record("a.pdf", 1, vec![1.0, 0.1]),
                record("a.pdf", 2, vec![1.0, 1.0]),
            ])
            .expect("ingest");

        let hits = store.query(&[1.0, 0.0], 2).expect("query");
        let ids: Vec<usize> = hits.iter().map(|hit| hit.chunk_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].filename, "a.pdf");
        assert_eq!(hits[0].text, "text 1");
    }

    #[test]
    fn query_on_empty_store_is_empty() {
        let (_dir, store) = open_temp();
        assert!(store.query(&[1.0, 0.0], 5).expect("query").is_empty());
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let (_dir, store) = open_temp();
        let err = store
            .replace_all(&[
                record("a.pdf", 0, vec![1.0, 0.0]),
                record("a.pdf", 1, vec![1.0, 0.0, 0.0]),
            ])
            .expect_err("mixed dims rejected");
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn clear_empties_store_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = ChunkStore::open(dir.path()).expect("open");
            store
                .replace_all(&[record("a.pdf", 0, vec![1.0])])
                .expect("ingest");
        }
        let reopened = ChunkStore::open(dir.path()).expect("reopen");
        assert_eq!(reopened.count().expect("count"), 1);
        assert_eq!(reopened.clear().expect("clear"), 1);
        assert_eq!(reopened.count().expect("count"), 0);
    }
}
