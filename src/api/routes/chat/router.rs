//! Router for the chat API

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use super::public;
use crate::api::public::ApiError;
use crate::api::state::SharedState;

/// Continue a session with a new user message
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<public::ChatRequest>,
) -> Result<Json<public::ChatResponse>, ApiError> {
    let reply = state
        .chat
        .chat(&payload.session_id, &payload.message)
        .await?;

    Ok(Json(public::ChatResponse::new(&reply)))
}

/// Get the transcript of a single chat session
async fn chat_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(transcript) = state.chat.transcript(&id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Chat session {} not found", id)})),
        )
            .into_response());
    };

    Ok(Json(public::ChatTranscriptResponse {
        session_id: id,
        transcript,
    })
    .into_response())
}

/// List all live chat sessions
async fn chat_list(
    State(state): State<SharedState>,
) -> Result<Json<public::ChatSessionsResponse>, ApiError> {
    let sessions = state.chat.sessions().await?;
    Ok(Json(public::ChatSessionsResponse { sessions }))
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(chat_handler))
        .route("/sessions", get(chat_list))
        // Under its own suffix so a session named "sessions" is reachable
        .route("/{id}/transcript", get(chat_session))
}
