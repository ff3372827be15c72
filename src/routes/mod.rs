//! API Routes
//!
//! HTTP and WebSocket surface:
//! - `/api/stream` - WebSocket task submission and live event feed
//! - `/api/chats` - Conversation CRUD and search
//! - `/api/documents` - Document knowledge base
//! - `/api/agents` - Agent catalog
//! - `/api/health` - Health check

pub mod agents;
pub mod chat;
pub mod documents;
pub mod health;
pub mod stream;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::AppState;

pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(stream::router(state.clone()))
        .merge(chat::router(state.clone()))
        .merge(documents::router(state.clone()))
        .merge(agents::router())
        .merge(health::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
