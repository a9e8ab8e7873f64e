pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/", get(chat::chat_page))
        .route("/chat", get(chat::chat_page))
        .route("/api/chat/transcript", get(chat::get_transcript))
        .route("/api/chat/message", post(chat::send_message))
        .with_state(state)
}
