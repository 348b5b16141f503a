//! HTTP surface over [`RagEngine`].
//!
//! Engine calls are blocking (model inference, SQLite, provider HTTP) and run on the blocking
//! pool so the async workers stay free.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::engine::{RagEngine, Source};
use crate::error::RagError;
use crate::pdf::is_pdf_filename;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<RagEngine>,
    default_book: Arc<PathBuf>,
    default_book_name: Arc<String>,
}

impl AppState {
    /// Wraps the engine and the default book location reported by `/book-status`.
    pub fn new(engine: Arc<RagEngine>, default_book: PathBuf, default_book_name: String) -> Self {
        Self {
            engine,
            default_book: Arc::new(default_book),
            default_book_name: Arc::new(default_book_name),
        }
    }
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    health: &'static str,
}

/// Successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Fixed success message.
    pub message: String,
    /// Uploaded file name.
    pub filename: String,
    /// Pages in the PDF.
    pub pages: usize,
    /// Chunks stored.
    pub chunks: usize,
}

/// Body of `POST /ask`.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Natural-language question.
    pub question: String,
}

/// Answer with its cited passages.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// Echo of the question.
    pub question: String,
    /// Model answer.
    pub answer: String,
    /// Cited passages.
    pub sources: Vec<Source>,
}

/// Service health and store size.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy` when the handler runs.
    pub status: String,
    /// Stored chunk count.
    pub documents_count: usize,
    /// `provider:model` label.
    pub model: String,
}

/// Default book presence and load state.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookStatusResponse {
    /// Whether the default book exists on disk.
    pub has_default_book: bool,
    /// Its file name, when present.
    pub default_book_name: Option<String>,
    /// Whether any chunks are stored.
    pub documents_loaded: bool,
    /// Stored chunk count.
    pub total_chunks: usize,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

/// Raw store size.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    /// Stored chunk count.
    pub count: usize,
}

/// Error payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Failure description.
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Builds the application router.
pub fn router(state: AppState, upload_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/book-status", get(book_status))
        .route("/upload", post(upload))
        .route("/ask", post(ask))
        .route("/clear", delete(clear))
        .route("/debug/chroma", get(debug_count))
        .layer(DefaultBodyLimit::max(upload_limit_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves until ctrl-c.
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docqa-server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "PDF Q&A API",
        health: "/health",
    })
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = run_blocking(&state, |engine| Ok(engine.stats()))
        .await
        .map_err(|err| internal_error(err.to_string()))?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        documents_count: stats.documents_count,
        model: stats.model,
    }))
}

async fn book_status(State(state): State<AppState>) -> Result<Json<BookStatusResponse>, ApiError> {
    let stats = run_blocking(&state, |engine| Ok(engine.stats()))
        .await
        .map_err(|err| internal_error(err.to_string()))?;
    let has_default_book = state.default_book.is_file();
    Ok(Json(BookStatusResponse {
        has_default_book,
        default_book_name: has_default_book.then(|| state.default_book_name.to_string()),
        documents_loaded: stats.documents_count > 0,
        total_chunks: stats.documents_count,
    }))
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| bad_request(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_pdf_filename(&filename) {
            return Err(bad_request("Only PDF files are allowed"));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| internal_error(format!("Error processing PDF: {err}")))?;
        file = Some((filename, bytes));
        break;
    }
    let (filename, bytes) = file.ok_or_else(|| bad_request("missing 'file' field"))?;
    debug!(filename = %filename, bytes = bytes.len(), "received upload");

    let name = filename.clone();
    let summary = run_blocking(&state, move |engine| engine.ingest(&bytes, &name))
        .await
        .map_err(|err| internal_error(format!("Error processing PDF: {err}")))?;
    Ok(Json(UploadResponse {
        message: "PDF processed successfully".to_string(),
        filename,
        pages: summary.pages,
        chunks: summary.chunks,
    }))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let question = request.question.clone();
    let answer = run_blocking(&state, move |engine| engine.ask(&question))
        .await
        .map_err(|err| internal_error(format!("Error answering question: {err}")))?;
    Ok(Json(AnswerResponse {
        question: request.question,
        answer: answer.answer,
        sources: answer.sources,
    }))
}

async fn clear(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    run_blocking(&state, |engine| engine.clear())
        .await
        .map_err(|err| internal_error(format!("Error clearing documents: {err}")))?;
    Ok(Json(MessageResponse {
        message: "All documents cleared successfully".to_string(),
    }))
}

async fn debug_count(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let count = run_blocking(&state, |engine| engine.count())
        .await
        .map_err(|err| internal_error(err.to_string()))?;
    Ok(Json(CountResponse { count }))
}

/// Runs an engine call on the blocking pool.
async fn run_blocking<T, F>(state: &AppState, job: F) -> Result<T, RagError>
where
    T: Send + 'static,
    F: FnOnce(&RagEngine) -> Result<T, RagError> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || job(&engine))
        .await
        .map_err(|err| RagError::Task(err.to_string()))?
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            detail: message.into(),
        }),
    )
}

fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            detail: message.into(),
        }),
    )
}
