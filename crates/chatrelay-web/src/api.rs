//! REST endpoint handlers.
//!
//! Plain-HTTP counterpart of the GraphQL surface, for callers that just want
//! to POST a JSON body.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chatrelay::ApiError;
use chatrelay::context::{ModelInfo, known_models};
use serde::Serialize;

use crate::service::{ChatInput, ChatReply, ChatService, Health};

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}

/// GET /health — Liveness check.
pub async fn health(State(app): State<AppState>) -> Json<Health> {
    Json(app.service.health())
}

/// GET /api/models — Known models and their context windows.
pub async fn list_models() -> Json<Vec<ModelInfo>> {
    Json(known_models())
}

/// POST /api/chat — Relay one chat turn.
///
/// Returns the normalized reply, or an [`ErrorBody`] with the mapped status.
/// Bodies that fail to parse are reported as 400 in the same shape.
pub async fn post_chat(
    State(app): State<AppState>,
    body: Result<Json<ChatInput>, JsonRejection>,
) -> Result<Json<ChatReply>, ErrorResponse> {
    let Json(body) = body?;
    let reply = app.service.chat(body).await?;
    Ok(Json(reply))
}

/// JSON error body.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
}

/// [`ApiError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ErrorResponse(pub ApiError);

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self(ApiError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.0.outbound_status();
        let body = ErrorBody {
            error: self.0.user_message(),
            code: self.0.code(),
            status,
        };
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        (status, Json(body)).into_response()
    }
}
