//! HTTP surface for candidate chat.

use axum::extract::State;
use axum::Json;

use crate::chat::{respond, ChatRequest, ChatResponse};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/v1/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("Missing message".to_string()));
    }

    let response = respond(
        state.invoker.as_ref(),
        &state.conversations,
        state.config.chat_timeout,
        &req,
    )
    .await
    .map_err(|e| AppError::Model(e.to_string()))?;

    Ok(Json(response))
}
