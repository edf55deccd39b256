//! API Routes
//!
//! - `/api/chat` - conversational entry point (router + ReAct loop)
//! - `/api/predict/yield` - structured yield prediction
//! - `/api/pest/classify` - pest image classification
//! - `/api/kb/*` - knowledge base ingestion and search
//! - `/api/health` - health checks

pub mod chat;
pub mod health;
pub mod kb;
pub mod pest;
pub mod predict;

use crate::middleware::{cors, rate_limiter};
use crate::models::AppState;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the main application router with CORS, tracing, and the global
/// rate limit applied.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let limiter = rate_limiter::build(state.config.server.rate_limit_per_minute);
    let server_config = state.config.server.clone();

    let api_router = Router::new()
        .merge(chat::router(state.clone()))
        .merge(predict::router(state.clone()))
        .merge(pest::router(state.clone()))
        .merge(kb::router(state.clone()))
        .merge(health::router(state))
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limiter::rate_limiter_middleware,
        ));

    cors::apply_cors(api_router, &server_config).layer(TraceLayer::new_for_http())
}
