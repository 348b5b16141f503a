#![warn(missing_docs)]
//! Core library for docqa: retrieval-augmented question answering over an uploaded PDF.

pub mod chunker;
pub mod config;
pub mod embedder;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod generator;
pub mod pdf;
pub mod providers;
pub mod server;
pub mod vector_store;

pub use chunker::{chunk_document, chunk_words, Chunk, ChunkingConfig};
pub use config::{EmbeddingBackend, ServerConfig};
pub use embedder::{Embedder, Embedding, LocalEmbedder, OpenAiEmbedder};
pub use embeddings::EmbeddedChunkRecord;
pub use engine::{Answer, EngineStats, IngestSummary, RagEngine, Source};
pub use error::{RagError, Result};
pub use generator::{AnswerGenerator, NO_CONTEXT_ANSWER};
pub use pdf::{extract_pdf, ExtractedDocument};
pub use providers::{AnswerProvider, ProviderKind, ProviderSettings};
pub use vector_store::{ChunkStore, ScoredChunk};
