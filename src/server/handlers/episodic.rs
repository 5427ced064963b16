use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub thread_id: String,
}

/// Records the thread's user/assistant exchanges as episodes and reports
/// how many were new versus already known.
pub async fn extract_learning(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExtractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .conversations
        .load_conversation(&payload.thread_id)
        .await?;

    let report = state
        .episodic
        .extract_from_thread(&payload.thread_id, &snapshot.messages)
        .await?;

    Ok(Json(report))
}

pub async fn episodic_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.episodic.status().await?;
    Ok(Json(status))
}
