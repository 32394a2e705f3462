//! Errores de las operaciones de chat y su traducción a respuestas HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is required")]
    EmptyMessage,
    #[error("message too long: {len} bytes (max {max})")]
    MessageTooLong { len: usize, max: usize },
    #[error("a reply is still pending for this session")]
    ReplyPending,
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("session limit reached ({0})")]
    TooManySessions(usize),
    #[error("turn limit reached for this session ({0}); reset it to continue")]
    TurnLimitReached(usize),
    #[error("the reply task stopped before answering")]
    ReplyInterrupted,
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyMessage => StatusCode::BAD_REQUEST,
            Self::MessageTooLong { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ReplyPending => StatusCode::CONFLICT,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::TurnLimitReached(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::ReplyInterrupted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!("Petición de chat rechazada ({}): {}", status, self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
