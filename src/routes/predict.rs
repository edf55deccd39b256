use crate::models::{AppState, YieldPredictRequest, YieldPredictResponse};
use crate::types::{AppError, AppResult};
use axum::{extract::State, routing::post, Json, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict/yield", post(predict_yield))
        .with_state(state)
}

async fn predict_yield(
    State(state): State<AppState>,
    Json(request): Json<YieldPredictRequest>,
) -> AppResult<Json<YieldPredictResponse>> {
    let model = state
        .yield_model
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("yield model not loaded".to_string()))?;

    let prediction = model.predict_named(&request.features)?;

    Ok(Json(YieldPredictResponse {
        prediction,
        unit: model.unit().to_string(),
        feature_order: model.feature_names().to_vec(),
    }))
}
