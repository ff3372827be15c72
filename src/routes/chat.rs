//! Conversation CRUD. All handlers resolve the caller from the bearer token
//! and fall back to the anonymous user; without a database pool the chat
//! surface reports itself unavailable.

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, UserIdentity};
use crate::db::{operations::generate_title, Chat, ChatPage, ChatStore, NewMessage};
use crate::models::{AppState, CreateChatRequest, ListChatsQuery, SearchQuery};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chats", post(create_chat).get(list_chats))
        .route("/api/chats/search", get(search_chats))
        .route("/api/chats/{id}", get(get_chat).delete(delete_chat))
        .with_state(state)
}

fn identity(state: &AppState, headers: &HeaderMap) -> UserIdentity {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    auth::identity_from_header(header, &state.config.auth.secret)
}

fn store(state: &AppState) -> AppResult<ChatStore> {
    state
        .chat_store()
        .ok_or_else(|| AppError::Unavailable("chat persistence is disabled".to_string()))
}

async fn create_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateChatRequest>,
) -> AppResult<Json<Chat>> {
    if request.message.trim().is_empty() {
        return Err(AppError::InvalidRequest("message must not be empty".to_string()));
    }

    let user = identity(&state, &headers);
    let store = store(&state)?;

    let chat = store
        .create_chat(&user.user_id, &generate_title(&request.message))
        .await?;
    let chat = store
        .add_message(
            chat.id,
            NewMessage {
                body: request.message,
                is_user: true,
                agents: None,
                results: None,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("chat".to_string()))?;

    info!(chat_id = %chat.id, user = %user.user_id, "Chat created");
    Ok(Json(chat))
}

async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListChatsQuery>,
) -> AppResult<Json<ChatPage>> {
    let user = identity(&state, &headers);
    let page = store(&state)?
        .list_chats(&user.user_id, query.limit, query.page)
        .await?;
    Ok(Json(page))
}

async fn search_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Chat>>> {
    let user = identity(&state, &headers);
    let chats = store(&state)?.search_chats(&user.user_id, &query.q).await?;
    Ok(Json(chats))
}

async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Chat>> {
    let chat = store(&state)?
        .get_chat(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("chat {id}")))?;
    Ok(Json(chat))
}

async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = store(&state)?.delete_chat(id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("chat {id}")));
    }
    info!(chat_id = %id, "Chat deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}
