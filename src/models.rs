//! Shared application state and HTTP request/response types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::data::BusinessDataset;
use crate::db::ChatStore;
use crate::documents::DocumentIndex;
use crate::events::TaskEvent;
use crate::llm::NarrativeClient;

/// Capacity of the global event fan-out. Slow subscribers that fall this far
/// behind lose events rather than stalling producers.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dataset: Arc<BusinessDataset>,
    pub narrative: Arc<NarrativeClient>,
    /// Global task event feed; every WebSocket client subscribes to it.
    pub events: broadcast::Sender<TaskEvent>,
    pub pool: Option<PgPool>,
    pub documents: DocumentIndex,
}

impl AppState {
    pub fn new(
        config: Config,
        dataset: BusinessDataset,
        narrative: NarrativeClient,
        pool: Option<PgPool>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            dataset: Arc::new(dataset),
            narrative: Arc::new(narrative),
            events,
            pool,
            documents: DocumentIndex::new(),
        }
    }

    pub fn chat_store(&self) -> Option<ChatStore> {
        self.pool.clone().map(ChatStore::new)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListChatsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_limit() -> i64 {
    20
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentRequest {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [&'static str],
}
