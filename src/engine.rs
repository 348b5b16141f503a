//! The ingestion and question-answering pipeline.
//!
//! Ingestion: extract → chunk → embed → replace the stored corpus.
//! Questions: embed → nearest neighbours → prompt → provider → answer with cited sources.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chunker::{chunk_document, ChunkingConfig};
use crate::embedder::Embedder;
use crate::embeddings::EmbeddedChunkRecord;
use crate::error::{RagError, Result};
use crate::generator::AnswerGenerator;
use crate::pdf::extract_pdf;
use crate::vector_store::{ChunkStore, ScoredChunk};

/// Default number of passages retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;
/// Characters of each source shown back to the caller before truncation.
pub const SOURCE_PREVIEW_CHARS: usize = 200;

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Pages in the PDF.
    pub pages: usize,
    /// Chunks stored.
    pub chunks: usize,
}

/// A cited passage returned with an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Chunk text, truncated for display.
    pub text: String,
    /// Estimated page.
    pub page: usize,
    /// Chunk position.
    pub chunk_id: usize,
}

/// Answer text plus the passages it was conditioned on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Model answer, or an explanatory message.
    pub answer: String,
    /// Retrieved passages in similarity order.
    pub sources: Vec<Source>,
}

/// Store size and active model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Stored chunk count.
    pub documents_count: usize,
    /// `provider:model` label.
    pub model: String,
    /// Provider name.
    pub provider: String,
}

/// Wires extraction, chunking, embedding, storage, and generation together.
pub struct RagEngine {
    embedder: Box<dyn Embedder>,
    store: ChunkStore,
    generator: AnswerGenerator,
    chunking: ChunkingConfig,
    top_k: usize,
}

impl RagEngine {
    /// Assembles an engine from its parts.
    pub fn new(
        embedder: Box<dyn Embedder>,
        store: ChunkStore,
        generator: AnswerGenerator,
        chunking: ChunkingConfig,
        top_k: usize,
    ) -> Self {
        match store.count() {
            Ok(count) => info!(count, "loaded stored chunks"),
            Err(err) => warn!(error = %err, "could not read stored chunks"),
        }
        Self {
            embedder,
            store,
            generator,
            chunking,
            top_k: top_k.max(1),
        }
    }

    /// Replaces the stored corpus with the chunks of `bytes`.
    ///
    /// A document that yields no text leaves the store untouched.
    pub fn ingest(&self, bytes: &[u8], filename: &str) -> Result<IngestSummary> {
        let size_mb = bytes.len() as f64 / (1024.0 * 1024.0);
        info!(filename, size_mb = %format!("{size_mb:.2}"), "processing pdf");

        let document = extract_pdf(bytes)?;
        info!(
            chars = document.text.chars().count(),
            pages = document.pages,
            "extracted text"
        );

        let chunks = chunk_document(&document.text, &self.chunking);
        info!(chunks = chunks.len(), "created chunks");
        if chunks.is_empty() {
            return Ok(IngestSummary {
                pages: document.pages,
                chunks: 0,
            });
        }

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        info!(
            chunks = texts.len(),
            model = self.embedder.model_name(),
            "generating embeddings"
        );
        let embeddings = self.embedder.embed_documents(&texts)?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "model returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<EmbeddedChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunkRecord::new(filename, chunk, embedding))
            .collect();
        self.store.replace_all(&records)?;

        Ok(IngestSummary {
            pages: document.pages,
            chunks: records.len(),
        })
    }

    /// Top-k passages for `question`, most similar first.
    pub fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed_query(question)?;
        self.store.query(&embedding, self.top_k)
    }

    /// Answers `question` from the stored corpus.
    pub fn ask(&self, question: &str) -> Result<Answer> {
        let hits = self.retrieve(question)?;
        let contexts: Vec<&str> = hits.iter().map(|hit| hit.text.as_str()).collect();
        let answer = self.generator.generate(question, &contexts);
        let sources = hits
            .iter()
            .map(|hit| Source {
                text: preview(&hit.text),
                page: hit.page,
                chunk_id: hit.chunk_id,
            })
            .collect();
        Ok(Answer { answer, sources })
    }

    /// Current chunk count and active model. A failed count reads as zero.
    pub fn stats(&self) -> EngineStats {
        let documents_count = self.store.count().unwrap_or_else(|err| {
            warn!(error = %err, "could not count stored chunks");
            0
        });
        let provider = self.generator.provider();
        EngineStats {
            documents_count,
            model: provider.label(),
            provider: provider.kind().as_str().to_string(),
        }
    }

    /// Whether the stored corpus came from `filename`. A failed lookup reads as false.
    pub fn has_document(&self, filename: &str) -> bool {
        self.store.has_filename(filename).unwrap_or_else(|err| {
            warn!(error = %err, filename, "could not inspect stored chunks");
            false
        })
    }

    /// Deletes every stored chunk.
    pub fn clear(&self) -> Result<()> {
        let removed = self.store.clear()?;
        info!(removed, "cleared stored chunks");
        Ok(())
    }

    /// Ingests the book at `path` under `name` unless the store already holds its chunks.
    ///
    /// Returns the summary when the book was (re)ingested. A missing file or a failed
    /// ingestion is logged and leaves the store as it was.
    pub fn load_default_book(&self, path: &Path, name: &str) -> Option<IngestSummary> {
        if !path.is_file() {
            info!(path = %path.display(), "no default book found");
            return None;
        }
        let stored = self.stats().documents_count;
        if self.has_document(name) {
            info!(chunks = stored, "default book already loaded from database");
            return None;
        }
        if stored > 0 {
            info!(
                chunks = stored,
                book = name,
                "stored chunks belong to another document; re-processing default book"
            );
        } else {
            info!("no cached data found; processing default book for the first time");
        }

        let result = std::fs::read(path)
            .map_err(RagError::from)
            .and_then(|bytes| self.ingest(&bytes, name));
        match result {
            Ok(summary) => {
                info!(
                    pages = summary.pages,
                    chunks = summary.chunks,
                    "default book loaded"
                );
                Some(summary)
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "could not load default book");
                None
            }
        }
    }

    /// Raw stored chunk count.
    pub fn count(&self) -> Result<usize> {
        self.store.count()
    }
}

/// First [`SOURCE_PREVIEW_CHARS`] characters plus `...`, or the text unchanged when short enough.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(SOURCE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sources_are_verbatim() {
        assert_eq!(preview("short"), "short");
        let exact = "x".repeat(200);
        assert_eq!(preview(&exact), exact);
    }

    #[test]
    fn long_sources_are_cut_at_two_hundred_chars() {
        let long = "y".repeat(201);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), 203);
        assert!(shown.ends_with("y..."));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = "é".repeat(250);
        let shown = preview(&long);
        assert_eq!(shown, format!("{}...", "é".repeat(200)));
    }
}
