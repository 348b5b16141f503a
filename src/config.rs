//! Server configuration parsed from flags and environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::chunker::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedder::{Embedder, LocalEmbedder, OpenAiEmbedder};
use crate::engine::DEFAULT_TOP_K;
use crate::error::{RagError, Result};
use crate::generator::{DEFAULT_MAX_COMPLETION_TOKENS, DEFAULT_TEMPERATURE};
use crate::providers::{
    ProviderSettings, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_GROQ_BASE_URL,
    DEFAULT_GROQ_MODEL,
};

/// Where chunk embeddings are computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 running in-process.
    Local,
    /// An OpenAI-compatible `/embeddings` endpoint.
    Openai,
}

/// Command-line interface for the question-answering server.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "docqa-server",
    about = "HTTP API that answers questions about an uploaded PDF"
)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "DOCQA_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Directory holding the persistent vector database.
    #[arg(long, env = "DOCQA_DATA_DIR", default_value = "vector_db")]
    pub data_dir: PathBuf,

    /// PDF ingested at startup unless the store already holds it.
    #[arg(
        long,
        env = "DOCQA_DEFAULT_BOOK",
        default_value = "default_books/default_book.pdf"
    )]
    pub default_book: PathBuf,

    /// Groq API key (preferred provider).
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    /// Groq chat model.
    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_GROQ_MODEL)]
    pub groq_model: String,

    /// Base URL for Groq's OpenAI-compatible API.
    #[arg(long, env = "DOCQA_GROQ_BASE", default_value = DEFAULT_GROQ_BASE_URL)]
    pub groq_base_url: String,

    /// Gemini API key (used when no Groq key is set).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Base URL for the Gemini REST API.
    #[arg(long, env = "DOCQA_GEMINI_BASE", default_value = DEFAULT_GEMINI_BASE_URL)]
    pub gemini_base_url: String,

    /// Seconds before language-model requests time out.
    #[arg(long, env = "DOCQA_LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,

    /// Sampling temperature for answers.
    #[arg(long, env = "DOCQA_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Maximum tokens requested per answer.
    #[arg(long, env = "DOCQA_MAX_COMPLETION_TOKENS", default_value_t = DEFAULT_MAX_COMPLETION_TOKENS)]
    pub max_completion_tokens: usize,

    /// Words per chunk.
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Words shared by adjacent chunks.
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    /// Passages retrieved per question.
    #[arg(long, env = "DOCQA_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Embedding backend.
    #[arg(long, env = "DOCQA_EMBEDDING_BACKEND", value_enum, default_value = "local")]
    pub embedding_backend: EmbeddingBackend,

    /// Cache directory for downloaded local model weights.
    #[arg(long, env = "DOCQA_EMBED_CACHE_DIR")]
    pub embed_cache_dir: Option<PathBuf>,

    /// API key for the OpenAI-compatible embedding backend.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL for OpenAI-compatible embeddings.
    #[arg(long, env = "DOCQA_OPENAI_BASE", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Remote embedding model identifier.
    #[arg(long, env = "DOCQA_OPENAI_MODEL", default_value = "text-embedding-3-small")]
    pub openai_model: String,

    /// Max inputs per remote embedding request.
    #[arg(long, env = "DOCQA_OPENAI_BATCH", default_value_t = 32)]
    pub openai_batch_size: usize,

    /// Seconds before remote embedding requests time out.
    #[arg(long, env = "DOCQA_OPENAI_TIMEOUT_SECS", default_value_t = 30)]
    pub openai_timeout_secs: u64,

    /// Retry attempts for transient remote embedding errors.
    #[arg(long, env = "DOCQA_OPENAI_MAX_RETRIES", default_value_t = 5)]
    pub openai_max_retries: usize,

    /// Largest accepted upload, in MiB.
    #[arg(long, env = "DOCQA_UPLOAD_LIMIT_MB", default_value_t = 50)]
    pub upload_limit_mb: usize,
}

impl ServerConfig {
    /// Parsed bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|_| RagError::Config(format!("invalid bind address {}", self.bind)))
    }

    /// Validated chunk window settings.
    pub fn chunking(&self) -> Result<ChunkingConfig> {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap)
    }

    /// Provider credentials and endpoints.
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            groq_api_key: self.groq_api_key.clone(),
            groq_model: self.groq_model.clone(),
            groq_base_url: self.groq_base_url.clone(),
            gemini_api_key: self.gemini_api_key.clone(),
            gemini_model: self.gemini_model.clone(),
            gemini_base_url: self.gemini_base_url.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs.max(1)),
        }
    }

    /// Builds the configured embedding backend.
    pub fn build_embedder(&self) -> Result<Box<dyn Embedder>> {
        match self.embedding_backend {
            EmbeddingBackend::Local => Ok(Box::new(LocalEmbedder::new(
                self.embed_cache_dir.clone(),
            )?)),
            EmbeddingBackend::Openai => {
                let key = self.openai_api_key.as_deref().ok_or_else(|| {
                    RagError::Config(
                        "OPENAI_API_KEY must be set for the openai embedding backend".to_string(),
                    )
                })?;
                Ok(Box::new(OpenAiEmbedder::new(
                    key,
                    &self.openai_base_url,
                    self.openai_model.clone(),
                    Duration::from_secs(self.openai_timeout_secs.max(1)),
                    self.openai_max_retries,
                    self.openai_batch_size,
                )?))
            }
        }
    }

    /// File name used to recognise the default book in stored metadata.
    pub fn default_book_name(&self) -> String {
        default_book_name(&self.default_book)
    }

    /// Upload body limit in bytes.
    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb.max(1).saturating_mul(1024 * 1024)
    }
}

fn default_book_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["docqa-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--bind",
            "127.0.0.1:9000",
            "--chunk-size",
            "100",
            "--chunk-overlap",
            "10",
            "--embedding-backend",
            "openai",
            "--default-book",
            "books/physics.pdf",
        ]);
        assert_eq!(config.bind_addr().expect("addr").port(), 9000);
        assert_eq!(config.chunking().expect("chunking").stride(), 90);
        assert_eq!(config.embedding_backend, EmbeddingBackend::Openai);
        assert_eq!(config.default_book_name(), "physics.pdf");
    }

    #[test]
    fn rejects_overlap_at_least_chunk_size() {
        let config = parse(&["--chunk-size", "50", "--chunk-overlap", "50"]);
        assert!(config.chunking().is_err());
    }

    #[test]
    fn openai_backend_requires_key() {
        let config = parse(&["--embedding-backend", "openai"]);
        if config.openai_api_key.is_none() {
            assert!(config.build_embedder().is_err());
        }
    }

    #[test]
    fn upload_limit_is_in_mebibytes() {
        let config = parse(&["--upload-limit-mb", "2"]);
        assert_eq!(config.upload_limit_bytes(), 2 * 1024 * 1024);
    }
}
