pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat_handlers;
use crate::config::MAX_UPLOAD_BYTES;
use crate::parser::handlers as parser_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/upload", post(parser_handlers::handle_upload))
        .route("/api/v1/parse", post(parser_handlers::handle_parse))
        .route(
            "/api/v1/parse/stream",
            get(parser_handlers::handle_parse_stream),
        )
        .route("/api/v1/chat", post(chat_handlers::handle_chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
