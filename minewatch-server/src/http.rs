//! Minewatch HTTP REST API
//!
//! Axum-based HTTP server for the dashboard UI. Each endpoint has a thin axum
//! handler that delegates to an inner function returning `(StatusCode, Value)`,
//! so the logic can be exercised without axum dispatch.
//!
//! Endpoints:
//! - GET  /health                 — liveness plus transcript size and backend
//! - GET  /version                — server version info
//! - GET  /api/chat               — transcript, optionally paged
//! - POST /api/chat               — submit a turn, returns `{user, assistant}`
//! - GET  /api/<fixture>          — static dashboard JSON (see `fixtures::FIXTURE_ROUTES`)

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use minewatch_core::{ChatError, ChatService, MinewatchConfig, Page};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::fixtures::{FixtureDir, FixtureError, FIXTURE_ROUTES};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub chat: ChatService,
    pub fixtures: FixtureDir,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let mut router: Router<Arc<HttpState>> = Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/chat", get(list_chat_handler).post(submit_chat_handler));

    for &(path, file) in FIXTURE_ROUTES {
        router = router.route(
            path,
            get(move |State(state): State<Arc<HttpState>>| fixture_handler(state, file)),
        );
    }

    router.with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    config: &MinewatchConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Minewatch HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ChatRequest {
    pub role: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            status: "error".to_string(),
        }
    }

    fn into_value(self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "status": self.status,
        })
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check.
pub async fn health_inner(chat: &ChatService) -> (StatusCode, serde_json::Value) {
    let store = chat.store();
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "messages": store.count().await,
            "backend": store.backend(),
        }),
    )
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "minewatch/1",
    })
}

/// Inner list — full transcript unless the page narrows it.
pub async fn list_chat_inner(chat: &ChatService, page: Page) -> (StatusCode, serde_json::Value) {
    let messages = chat.list_messages(page).await;
    match serde_json::to_value(messages) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(e.to_string()).into_value(),
        ),
    }
}

/// Inner submit — validates, records, returns `201 {user, assistant}`.
pub async fn submit_chat_inner(
    chat: &ChatService,
    req: ChatRequest,
) -> (StatusCode, serde_json::Value) {
    let role = req.role.unwrap_or_default();
    let content = req.content.unwrap_or_default();

    match chat.submit_message(&role, &content, req.metadata).await {
        Ok(submission) => match serde_json::to_value(submission) {
            Ok(body) => (StatusCode::CREATED, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(e.to_string()).into_value(),
            ),
        },
        Err(ChatError::Validation(msg)) => {
            (StatusCode::BAD_REQUEST, ErrorResponse::new(msg).into_value())
        }
    }
}

/// Inner fixture passthrough.
pub async fn fixture_inner(fixtures: &FixtureDir, file: &str) -> (StatusCode, serde_json::Value) {
    match fixtures.read(file).await {
        Ok(body) => (StatusCode::OK, body),
        Err(e @ FixtureError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, ErrorResponse::new(e.to_string()).into_value())
        }
        Err(e) => {
            tracing::error!(file, error = %e, "Failed to serve fixture");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(e.to_string()).into_value(),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.chat).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn list_chat_handler(
    State(state): State<Arc<HttpState>>,
    page: Result<Query<Page>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match page {
        Ok(Query(page)) => list_chat_inner(&state.chat, page).await,
        Err(rejection) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(rejection.body_text()).into_value(),
        ),
    };
    (status, Json(body))
}

pub async fn submit_chat_handler(
    State(state): State<Arc<HttpState>>,
    req: Result<Json<ChatRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match req {
        Ok(Json(req)) => submit_chat_inner(&state.chat, req).await,
        Err(rejection) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(rejection.body_text()).into_value(),
        ),
    };
    (status, Json(body))
}

pub async fn fixture_handler(state: Arc<HttpState>, file: &'static str) -> impl IntoResponse {
    let (status, body) = fixture_inner(&state.fixtures, file).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
