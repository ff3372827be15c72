// Taskweave - multi-agent business analysis server with live task streaming

pub mod agents;
pub mod auth;
pub mod config;
pub mod data;
pub mod db;
pub mod documents;
pub mod events;
pub mod llm;
pub mod models;
pub mod routes;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
