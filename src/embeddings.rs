//! Shared embedding data structures passed between the embedder and the vector store.

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;

/// A chunk paired with the vector the embedding model produced for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunkRecord {
    /// Name of the uploaded file the chunk came from.
    pub filename: String,
    /// Sequential chunk position within the file.
    pub chunk_id: usize,
    /// Estimated page for the chunk.
    pub page: usize,
    /// Chunk body text submitted to the embedding model.
    pub text: String,
    /// Model embedding vector.
    pub embedding: Vec<f32>,
}

impl EmbeddedChunkRecord {
    /// Pairs a chunk with its embedding.
    pub fn new(filename: &str, chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            filename: filename.to_string(),
            chunk_id: chunk.chunk_id,
            page: chunk.page,
            text: chunk.text,
            embedding,
        }
    }

    /// Store identifier, `chunk_{index}`.
    pub fn store_id(&self) -> String {
        format!("chunk_{}", self.chunk_id)
    }
}
