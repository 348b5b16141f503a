//! Embedding backends.
//!
//! The engine only sees the [`Embedder`] trait; the concrete backend is picked from
//! configuration at startup.

use crate::error::Result;

pub mod local;
pub mod openai;

pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;

/// A vector embedding produced by a sentence-embedding model.
pub type Embedding = Vec<f32>;

/// Maps batches of text to fixed-length vectors, one per input, in input order.
pub trait Embedder: Send + Sync {
    /// Embeds document chunks for storage.
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embeds a single question for lookup.
    fn embed_query(&self, text: &str) -> Result<Embedding>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
