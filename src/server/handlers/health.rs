use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "conversation-demo"
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let thread_count = state.conversations.thread_count().await?;
    let total_messages = state.conversations.total_message_count().await?;
    let episodic = state.episodic.status().await?;
    let db_size_bytes = state.conversations.db_size_bytes();

    Ok(Json(json!({
        "thread_count": thread_count,
        "total_messages": total_messages,
        "episodic": episodic,
        "db_size_bytes": db_size_bytes
    })))
}
