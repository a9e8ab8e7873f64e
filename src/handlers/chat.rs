use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ConversationMessage, TurnOutcome};
use crate::services::conversation;
use crate::state::AppState;

pub async fn chat_page() -> Html<&'static str> {
    Html(include_str!("../web/chat.html"))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn get_transcript(State(state): State<Arc<AppState>>) -> Json<Vec<ConversationMessage>> {
    let session = state.session.lock().await;
    Json(session.messages().to_vec())
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    tracing::info!(message, "incoming chat message");

    let mut session = state.session.lock().await;
    let outcome = conversation::process_message(
        state.llm.as_ref(),
        state.api.as_ref(),
        &mut session,
        message,
        Duration::from_secs(state.config.llm_timeout_secs),
    )
    .await;

    Ok(Json(outcome))
}
