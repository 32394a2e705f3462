use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    chat::{self, QUICK_QUESTIONS},
    error::ChatError,
    models::ChatMessage,
    responder::{self, TopicId},
};

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct ChatPayload {
    message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    response: &'static str,
    topic: TopicId,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    open_sessions: usize,
}

#[derive(Serialize)]
pub struct TopicInfo {
    id: TopicId,
    matchers: &'static [&'static str],
}

#[derive(Serialize)]
pub struct SessionCreated {
    session_id: Uuid,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct TurnResponse {
    user: ChatMessage,
    bot: ChatMessage,
    topic: TopicId,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/suggestions", get(suggestions_handler))
        .route("/api/chat/topics", get(topics_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/:id", delete(delete_session_handler))
        .route(
            "/api/sessions/:id/messages",
            get(list_messages_handler).post(send_message_handler),
        )
        .route("/api/sessions/:id/reset", post(reset_session_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "FDA Compliance AI is running!",
        version: env!("CARGO_PKG_VERSION"),
        open_sessions: state.sessions.len(),
    })
}

/// Respuesta sin estado: sólo pasa el mensaje por el selector.
#[axum::debug_handler]
async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<ChatResponse>, ChatError> {
    let message = chat::validate_message(&payload.message, state.config.max_message_bytes)?;
    let topic = responder::select_topic(message);
    debug!("Consulta de chat resuelta con el tema {}", topic.id.as_str());
    Ok(Json(ChatResponse {
        response: topic.body,
        topic: topic.id,
    }))
}

#[axum::debug_handler]
async fn suggestions_handler() -> Json<[&'static str; 4]> {
    Json(QUICK_QUESTIONS)
}

#[axum::debug_handler]
async fn topics_handler() -> Json<Vec<TopicInfo>> {
    Json(
        responder::topics()
            .iter()
            .map(|t| TopicInfo {
                id: t.id,
                matchers: t.matchers,
            })
            .collect(),
    )
}

#[axum::debug_handler]
async fn create_session_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ChatError> {
    let (session_id, messages) = state.sessions.create()?;
    info!("Nueva sesión de chat: {}", session_id);
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            messages,
        }),
    ))
}

#[axum::debug_handler]
async fn list_messages_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ChatError> {
    Ok(Json(state.sessions.messages(id)?))
}

#[axum::debug_handler]
async fn send_message_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<TurnResponse>, ChatError> {
    let turn = state
        .sessions
        .submit(
            id,
            &payload.message,
            state.config.max_message_bytes,
            state.config.reply_delay,
        )
        .await?;
    let topic = responder::select_topic(&turn.user.text).id;
    Ok(Json(TurnResponse {
        user: turn.user,
        bot: turn.bot,
        topic,
    }))
}

#[axum::debug_handler]
async fn reset_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ChatError> {
    Ok(Json(state.sessions.reset(id)?))
}

#[axum::debug_handler]
async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ChatError> {
    state.sessions.remove(id)?;
    info!("Sesión de chat {} eliminada", id);
    Ok(StatusCode::NO_CONTENT)
}
