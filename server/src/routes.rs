//! HTTP surface: `POST /chat/` and `GET /health`.

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use finrag_core::{EmbeddingModel, LanguageModel};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::service::{ChatService, ServiceError};

/// Body of a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question.
    pub query: String,
}

/// Body of a successful chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The answer, or the no-match message.
    pub response: String,
}

/// Error body: `{"detail": "..."}` with status 500.
#[derive(Debug)]
pub struct ApiError {
    detail: String,
}

impl ApiError {
    fn unexpected(message: impl std::fmt::Display) -> Self {
        Self {
            detail: format!("An unexpected error occurred: {message}"),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Completion(error) => {
                tracing::error!(error = %error, "Completion API error");
                Self {
                    detail: format!("Completion API error: {error}"),
                }
            }
            ServiceError::Retrieval(error) => {
                tracing::error!(error = %error, "Unexpected error");
                Self::unexpected(error)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// Builds the router over a shared service.
///
/// The chat route is mounted with and without the trailing slash. Panics inside a handler
/// become the same 500 body as any other unexpected error.
pub fn router<M, L>(service: Arc<ChatService<M, L>>) -> Router
where
    M: EmbeddingModel + 'static,
    L: LanguageModel + 'static,
{
    Router::new()
        .route("/chat/", post(chat::<M, L>))
        .route("/chat", post(chat::<M, L>))
        .route("/health", get(health::<M, L>))
        .with_state(service)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn chat<M, L>(
    State(service): State<Arc<ChatService<M, L>>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError>
where
    M: EmbeddingModel + 'static,
    L: LanguageModel + 'static,
{
    let response = service.answer(&request.query).await?;
    Ok(Json(ChatResponse { response }))
}

async fn health<M, L>(State(service): State<Arc<ChatService<M, L>>>) -> impl IntoResponse
where
    M: EmbeddingModel + 'static,
    L: LanguageModel + 'static,
{
    Json(json!({ "status": "ok", "passages": service.passages() }))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");
    tracing::error!(panic = message, "Unexpected error");
    ApiError::unexpected(message).into_response()
}
