//! HTTP API server.
//!
//! Exposes the search and chat operations as JSON endpoints.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{CourseRagError, ErrorKind};
use crate::rag::{ChatResult, QueryRequest, RagEngine, SearchResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared application state.
pub struct AppState {
    pub engine: RagEngine,
    pub settings: Settings,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings, None) {
        Output::error(&format!("{}", e));
        Output::info("Run 'course-rag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let engine = RagEngine::from_settings(&settings).await?;
    if settings.openai.api_key.is_none() {
        Output::warning("No OpenAI API key configured; requests must supply api_key.");
    }

    let app = router(Arc::new(AppState { engine, settings }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("course-rag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Search", "POST /search");
    Output::kv("Chat", "POST /chat");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// === Response Types ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    vector_store: String,
    embedding_model: String,
    api_key_configured: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

/// Error response carrying the failure kind as status and label.
struct ApiError(CourseRagError);

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self.0.kind() {
            ErrorKind::InvalidInput => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
            ErrorKind::Embedding => (StatusCode::BAD_REQUEST, "embedding_failure"),
            ErrorKind::Retrieval => (StatusCode::INTERNAL_SERVER_ERROR, "retrieval_failure"),
            ErrorKind::Configuration => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            ErrorKind::Completion => (StatusCode::BAD_GATEWAY, "completion_failure"),
        }
    }
}

impl From<CourseRagError> for ApiError {
    fn from(err: CourseRagError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CourseRagError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        warn!("Request failed ({}): {}", kind, self.0);
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        vector_store: state.settings.vector_store.provider.to_string(),
        embedding_model: state.settings.embedding.model.clone(),
        api_key_configured: state.settings.openai.api_key.is_some(),
    })
}

async fn search(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<SearchResult>, ApiError> {
    let Json(req) = payload?;
    let query = req.into_query(&state.settings.rag)?;
    Ok(Json(state.engine.search(&query).await?))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ChatResult>, ApiError> {
    let Json(req) = payload?;
    let query = req.into_query(&state.settings.rag)?;
    Ok(Json(state.engine.chat(&query).await?))
}
