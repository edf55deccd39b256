// AgroAgent - agricultural AI assistant backend

pub mod agent;
pub mod config;
pub mod db;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod tools;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
