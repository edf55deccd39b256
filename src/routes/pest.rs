use crate::models::{AppState, PestClassifyRequest, PestClassifyResponse};
use crate::tools::pest_classifier::advice_for;
use crate::types::{AppError, AppResult};
use axum::{extract::State, routing::post, Json, Router};
use base64::Engine;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/pest/classify", post(classify_pest))
        .with_state(state)
}

async fn classify_pest(
    State(state): State<AppState>,
    Json(request): Json<PestClassifyRequest>,
) -> AppResult<Json<PestClassifyResponse>> {
    let classifier = state
        .pest_classifier
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("pest classifier not configured".to_string()))?;

    // Reject payloads that are not valid base64 before shipping them upstream.
    base64::engine::general_purpose::STANDARD
        .decode(&request.image_base64)
        .map_err(|_| AppError::InvalidRequest("image_base64 is not valid base64".to_string()))?;

    let classification = classifier.classify(&request.image_base64).await?;
    let advice = advice_for(&classification.label).to_string();

    Ok(Json(PestClassifyResponse {
        label: classification.label,
        confidence: classification.confidence,
        advice,
    }))
}
