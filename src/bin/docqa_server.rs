use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docqa::{AnswerGenerator, AnswerProvider, ChunkStore, RagEngine, ServerConfig};
use docqa::server::{self, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config.bind_addr()?;
    let chunking = config.chunking()?;

    // Provider credentials are checked before anything slow is loaded.
    let provider = AnswerProvider::from_settings(&config.provider_settings())
        .context("no AI provider available")?;
    info!(model = %provider.label(), "answer provider ready");
    let generator = AnswerGenerator::new(provider, config.temperature, config.max_completion_tokens);

    let embedder = config
        .build_embedder()
        .context("failed to initialise embedding backend")?;
    let store = ChunkStore::open(&config.data_dir)
        .with_context(|| format!("failed to open vector store in {}", config.data_dir.display()))?;
    let engine = Arc::new(RagEngine::new(
        embedder,
        store,
        generator,
        chunking,
        config.top_k,
    ));

    engine.load_default_book(&config.default_book, &config.default_book_name());

    let state = AppState::new(
        Arc::clone(&engine),
        config.default_book.clone(),
        config.default_book_name(),
    );
    let app = server::router(state, config.upload_limit_bytes());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime
        .block_on(server::serve(addr, app))
        .with_context(|| format!("server on {addr} failed"))?;
    drop(runtime);
    drop(engine);
    Ok(())
}
