//! Browser chat front end.
//!
//! Serves a single-page chat UI and the JSON API behind it. Uploaded PDFs go
//! into the UI collection; each browser tab holds one session whose
//! transcript lives in memory.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Chat page |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/documents?filename=<name>` | Ingest a PDF sent as the raw body |
//! | `POST` | `/api/sessions` | Start a session |
//! | `GET`  | `/api/sessions/{id}/messages` | Session transcript, oldest first |
//! | `POST` | `/api/sessions/{id}/messages` | Ask a question, returns the reply |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "ingest_failed", "message": "PDF extraction failed: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `ingest_failed` (422),
//! `inference_failed` (502), `internal` (500).

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::assistant::{AnswerError, Assistant, IngestError};
use crate::config::ServerConfig;
use crate::conversation::SessionStore;
use crate::models::{Message, Role};
use crate::pdf::source_name;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("ui.html");

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
    sessions: Arc<SessionStore>,
}

/// Bind `[server] bind` and serve until the process is terminated.
pub async fn run_server(config: &ServerConfig, assistant: Arc<Assistant>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    println!("Chat UI listening on http://{}", listener.local_addr()?);
    let sessions = SessionStore::with_capacity(config.max_sessions);
    axum::serve(listener, app(assistant, sessions)).await?;
    Ok(())
}

/// The full application, with a fresh session store of default capacity.
pub fn router(assistant: Arc<Assistant>) -> Router {
    app(assistant, SessionStore::new())
}

fn app(assistant: Arc<Assistant>, sessions: SessionStore) -> Router {
    let state = AppState {
        assistant,
        sessions: Arc::new(sessions),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/documents", post(handle_upload))
        .route("/api/sessions", post(handle_create_session))
        .route(
            "/api/sessions/{id}/messages",
            get(handle_transcript).post(handle_ask),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn ingest_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "ingest_failed",
        message: message.into(),
    }
}

fn inference_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "inference_failed",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

// ============ GET / and /health ============

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/documents ============

#[derive(Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    source: String,
    pages: usize,
    chunks: usize,
    message: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let filename = params
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| bad_request("filename query parameter is required"))?;
    if body.is_empty() {
        return Err(bad_request("request body must contain the PDF bytes"));
    }

    let source = source_name(std::path::Path::new(filename));
    let report = state
        .assistant
        .ingest_bytes(&source, body.to_vec())
        .await
        .map_err(|e| match e {
            IngestError::Load(load) => ingest_failed(load.to_string()),
            IngestError::Store(err) => internal(err),
        })?;

    let message = if report.chunks == 0 {
        format!(
            "No page in {} had enough text to memorize. Is it a scanned document?",
            report.source
        )
    } else {
        format!("Memorized {} pages from {}!", report.chunks, report.source)
    };

    Ok(Json(UploadResponse {
        source: report.source,
        pages: report.pages,
        chunks: report.chunks,
        message,
    }))
}

// ============ Sessions ============

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
}

async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session_id = state.sessions.create().map_err(internal)?;
    Ok((StatusCode::CREATED, Json(SessionResponse { session_id })))
}

fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| bad_request(format!("invalid session id: {}", raw)))
}

#[derive(Serialize)]
struct TranscriptResponse {
    messages: Vec<Message>,
}

async fn handle_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let id = parse_session_id(&id)?;
    let messages = state
        .sessions
        .transcript(&id)
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("session not found: {}", id)))?;
    Ok(Json(TranscriptResponse { messages }))
}

#[derive(Deserialize)]
struct AskRequest {
    content: String,
}

/// Append the question, answer it, append and return the reply.
///
/// When the model call fails the question stays in the transcript and no
/// reply is recorded.
async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Message>, AppError> {
    let id = parse_session_id(&id)?;
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;
    let question = request.content.trim();
    if question.is_empty() {
        return Err(bad_request("content must not be empty"));
    }

    if !state.sessions.exists(&id).map_err(internal)? {
        return Err(not_found(format!("session not found: {}", id)));
    }
    state
        .sessions
        .append(&id, Role::User, question)
        .map_err(internal)?;

    let reply = state
        .assistant
        .answer(question)
        .await
        .map_err(|e| match e {
            AnswerError::Inference(err) => inference_failed(err.to_string()),
            AnswerError::Retrieval(err) => internal(err),
        })?
        .into_text();

    let message = state
        .sessions
        .append(&id, Role::Assistant, &reply)
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("session not found: {}", id)))?;
    Ok(Json(message))
}
