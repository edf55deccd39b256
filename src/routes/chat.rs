use crate::db::DatabaseOperations;
use crate::models::{AppState, ChatRequest, ChatResponse, StoredMessage};
use crate::types::{AppError, AppResult};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(post_chat))
        .route("/api/chat/{conversation_id}/messages", get(get_messages))
        .with_state(state)
}

pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if request.message.trim().is_empty() && request.image_base64.is_none() {
        return Err(AppError::InvalidRequest(
            "message must not be empty".to_string(),
        ));
    }

    info!(
        message_len = request.message.len(),
        has_image = request.image_base64.is_some(),
        "Received chat request"
    );

    let conversation = match request.conversation_id {
        Some(id) => DatabaseOperations::get_conversation(&state.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("conversation {id}")))?,
        None => DatabaseOperations::create_conversation(&state.pool).await?,
    };

    let history = state.sessions.messages(conversation.id).await;

    DatabaseOperations::create_message(
        &state.pool,
        conversation.id,
        "user",
        &request.message,
        None,
    )
    .await?;

    let outcome = state
        .orchestrator
        .run(&request.message, request.image_base64.as_deref(), &history)
        .await;

    state
        .sessions
        .append(conversation.id, "user", &request.message)
        .await;
    state
        .sessions
        .append(conversation.id, "assistant", &outcome.reply)
        .await;

    DatabaseOperations::create_message(
        &state.pool,
        conversation.id,
        "assistant",
        &outcome.reply,
        outcome.tool_used.map(|t| t.as_str()),
    )
    .await?;

    info!(
        conversation_id = %conversation.id,
        tool_used = ?outcome.tool_used,
        "Chat response sent"
    );

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        conversation_id: conversation.id,
        tool_used: outcome.tool_used.map(|t| t.as_str().to_string()),
        steps: outcome.steps,
    }))
}

/// Full stored transcript for a conversation, oldest first.
async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<Vec<StoredMessage>>> {
    DatabaseOperations::get_conversation(&state.pool, conversation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("conversation {conversation_id}")))?;

    let messages =
        DatabaseOperations::get_messages_for_conversation(&state.pool, conversation_id).await?;

    Ok(Json(messages))
}
