use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::history::StoredMessage;
use crate::state::AppState;
use crate::ui::formatters::{
    reconstruct_assistant_response, separate_agent_outputs, truncate_title, AgentChunk,
};

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThreadRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    pub role: String,
    pub content: Option<String>,
    pub agent_chunks: Option<Vec<AgentChunk>>,
    pub tool_calls: Option<Value>,
}

/// Sidebar payload: most recent thread first, titles truncated for
/// display alongside the full title.
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.config.load_config()?;
    let max_chars = title_max_chars(&config);

    let mut threads = state.conversations.list_threads().await?;
    threads.reverse();

    let result: Vec<Value> = threads
        .into_iter()
        .map(|thread| {
            json!({
                "id": thread.id,
                "title": thread.title,
                "display_title": truncate_title(&thread.title, max_chars),
                "created_at": thread.created_at,
                "updated_at": thread.updated_at,
                "message_count": thread.message_count
            })
        })
        .collect();
    Ok(Json(json!({"threads": result})))
}

pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.conversations.create_thread(payload.title).await?;
    Ok(Json(snapshot))
}

pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = state
        .conversations
        .get_thread(&thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Thread not found".to_string()))?;

    let snapshot = state.conversations.load_conversation(&thread_id).await?;
    let messages: Vec<Value> = snapshot.messages.iter().map(format_message).collect();

    Ok(Json(json!({
        "thread": thread,
        "messages": messages,
        "processed_message_ids": snapshot.processed_message_ids,
        "processed_tool_ids": snapshot.processed_tool_ids
    })))
}

pub async fn get_thread_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let config = state.config.load_config()?;
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or_else(|| default_history_limit(&config));

    let messages = state.conversations.get_history(&thread_id, limit).await?;
    let formatted: Vec<Value> = messages.iter().map(format_message).collect();

    Ok(Json(json!({"messages": formatted})))
}

/// Appends one transcript row recorded by the agent system. The body
/// carries either the full content or per-agent chunks to reassemble.
pub async fn add_thread_message(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(payload): Json<AddMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !matches!(payload.role.as_str(), "user" | "assistant" | "system") {
        return Err(ApiError::BadRequest(format!(
            "Unknown message role '{}'",
            payload.role
        )));
    }

    let content = match payload.content {
        Some(content) => content,
        None => payload
            .agent_chunks
            .as_deref()
            .map(reconstruct_assistant_response)
            .unwrap_or_default(),
    };
    if content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Either content or agent_chunks is required".to_string(),
        ));
    }

    let message_id = state
        .conversations
        .add_message(&thread_id, &payload.role, &content, payload.tool_calls)
        .await?;

    Ok(Json(json!({"id": message_id, "success": true})))
}

pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(payload): Json<UpdateThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .conversations
        .rename_thread(&thread_id, &payload.title)
        .await?;
    Ok(Json(json!({"success": true})))
}

pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.conversations.delete_thread(&thread_id).await?;
    Ok(Json(json!({"success": true})))
}

/// Assistant rows additionally carry the separated final/progress
/// sections the page renders.
fn format_message(message: &StoredMessage) -> Value {
    let sections = if message.role == "assistant" && !message.content.is_empty() {
        Some(separate_agent_outputs(&message.content))
    } else {
        None
    };

    json!({
        "id": message.id,
        "role": message.role,
        "content": message.content,
        "tool_calls": message.tool_calls,
        "created_at": message.created_at,
        "sections": sections
    })
}

fn title_max_chars(config: &Value) -> usize {
    config
        .get("ui")
        .and_then(|v| v.get("title_max_chars"))
        .and_then(|v| v.as_u64())
        .unwrap_or(30) as usize
}

fn default_history_limit(config: &Value) -> i64 {
    config
        .get("ui")
        .and_then(|v| v.get("history_limit"))
        .and_then(|v| v.as_u64())
        .unwrap_or(200) as i64
}
