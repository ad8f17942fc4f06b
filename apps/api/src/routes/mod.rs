pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::chat::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/v1/chat", post(handlers::handle_chat))
        .route("/api/v1/chat/stream", post(handlers::handle_chat_stream))
        .route(
            "/api/v1/chat/stream/estimate",
            post(handlers::handle_estimate),
        )
        .route(
            "/api/v1/chat/cache/stats",
            get(handlers::handle_cache_stats),
        )
        .route("/api/v1/chat/cache", delete(handlers::handle_clear_cache))
        .with_state(state)
}
