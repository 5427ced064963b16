use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};

use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::ui::components::{
    render_chat_messages, render_demo_banner, render_header, render_page, render_sidebar,
};

/// The demo page. `?thread=<id>` selects the displayed conversation;
/// without it the most recently updated thread is shown.
pub async fn demo_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.config.load_config()?;
    let title = config
        .get("app")
        .and_then(|v| v.get("title"))
        .and_then(|v| v.as_str())
        .unwrap_or("RepurAgent")
        .to_string();
    let logo_path = config
        .get("app")
        .and_then(|v| v.get("logo_path"))
        .and_then(|v| v.as_str())
        .unwrap_or("images/logo.png")
        .to_string();
    let title_max_chars = config
        .get("ui")
        .and_then(|v| v.get("title_max_chars"))
        .and_then(|v| v.as_u64())
        .unwrap_or(30) as usize;

    let threads = state.conversations.list_threads().await?;

    let current_thread_id = match params.get("thread") {
        Some(id) => {
            state
                .conversations
                .get_thread(id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Thread '{}' does not exist", id)))?;
            id.clone()
        }
        None => threads
            .iter()
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at))
            .map(|thread| thread.id.clone())
            .unwrap_or_default(),
    };

    let messages = if current_thread_id.is_empty() {
        Vec::new()
    } else {
        state
            .conversations
            .load_conversation(&current_thread_id)
            .await?
            .messages
    };

    let episodic_status = state.episodic.status().await?;
    let db_file_name = state
        .conversations
        .db_path()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("repuragent_memory.db")
        .to_string();
    let db_size = state.conversations.db_size_bytes();

    let header = render_header(&title, &state.paths.project_root.join(&logo_path));
    let sidebar = render_sidebar(
        &episodic_status,
        &threads,
        &current_thread_id,
        title_max_chars,
        &db_file_name,
        db_size,
    );
    let chat = render_chat_messages(&messages);

    Ok(Html(render_page(
        &title,
        &header,
        &render_demo_banner(),
        &sidebar,
        &chat,
    )))
}
