//! In-process sentence embeddings via fastembed (ONNX runtime).

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::{Embedder, Embedding};
use crate::error::{RagError, Result};

/// Model identifier reported in logs.
pub const LOCAL_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// all-MiniLM-L6-v2 running locally. The model is downloaded on first use.
pub struct LocalEmbedder {
    model: Mutex<TextEmbedding>,
}

impl LocalEmbedder {
    /// Loads the model, caching downloaded weights under `cache_dir` when given.
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self> {
        info!(model = LOCAL_MODEL_NAME, "loading embedding model");
        let mut opts =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            opts = opts.with_cache_dir(dir);
        }
        let model = TextEmbedding::try_new(opts).map_err(|e| RagError::Embedding(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| RagError::Lock("embedding model"))?;
        model
            .embed(texts, None)
            .map_err(|e| RagError::Embedding(e.to_string()))
    }
}

impl Embedder for LocalEmbedder {
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed(texts)
    }

    fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.embed(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("model returned no embeddings".to_string()))
    }

    fn model_name(&self) -> &str {
        LOCAL_MODEL_NAME
    }
}
