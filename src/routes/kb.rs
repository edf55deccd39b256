use crate::models::{AppState, KbAddRequest, KbAddResponse, KbSearchParams};
use crate::tools::knowledge_base::KbHit;
use crate::types::{AppError, AppResult};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/kb/documents", post(add_document))
        .route("/api/kb/search", get(search))
        .with_state(state)
}

async fn add_document(
    State(state): State<AppState>,
    Json(request): Json<KbAddRequest>,
) -> AppResult<Json<KbAddResponse>> {
    let kb = state
        .knowledge_base
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("knowledge base requires an LLM provider for embeddings".to_string()))?;

    let id = kb
        .add_document(&request.content, request.source.as_deref())
        .await?;

    Ok(Json(KbAddResponse { id }))
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<KbSearchParams>,
) -> AppResult<Json<Vec<KbHit>>> {
    let kb = state
        .knowledge_base
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("knowledge base requires an LLM provider for embeddings".to_string()))?;

    if params.q.trim().is_empty() {
        return Err(AppError::InvalidRequest("query must not be empty".to_string()));
    }

    let hits = kb.search(&params.q, params.limit).await?;
    Ok(Json(hits))
}
