//! Document knowledge base endpoints. Uploads are plain text; extraction of
//! binary formats happens client-side.

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, UserIdentity};
use crate::documents::{ChunkMatch, DocumentMeta};
use crate::models::{AppState, DocumentSearchRequest, UploadDocumentRequest};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/documents", post(upload_document).get(list_documents))
        .route("/api/documents/search", post(search_documents))
        .route("/api/documents/{id}", axum::routing::delete(delete_document))
        .with_state(state)
}

fn identity(state: &AppState, headers: &HeaderMap) -> UserIdentity {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    auth::identity_from_header(header, &state.config.auth.secret)
}

async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UploadDocumentRequest>,
) -> AppResult<(StatusCode, Json<DocumentMeta>)> {
    if request.filename.trim().is_empty() {
        return Err(AppError::InvalidRequest("filename must not be empty".to_string()));
    }
    if request.content.trim().is_empty() {
        return Err(AppError::InvalidRequest("content must not be empty".to_string()));
    }

    let user = identity(&state, &headers);
    let summary = state.narrative.summarize_document(&request.content).await;
    let meta = state
        .documents
        .add(&user.user_id, &request.filename, &request.content, summary)
        .await;

    info!(id = %meta.id, filename = %meta.filename, user = %user.user_id, "Document uploaded");
    Ok((StatusCode::CREATED, Json(meta)))
}

async fn list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<Vec<DocumentMeta>> {
    let user = identity(&state, &headers);
    Json(state.documents.list(&user.user_id).await)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSearchResponse {
    query: String,
    sources: Vec<ChunkMatch>,
}

async fn search_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DocumentSearchRequest>,
) -> AppResult<Json<DocumentSearchResponse>> {
    if request.query.trim().is_empty() {
        return Err(AppError::InvalidRequest("query must not be empty".to_string()));
    }

    let user = identity(&state, &headers);
    let sources = state.documents.query(&user.user_id, &request.query).await;
    Ok(Json(DocumentSearchResponse { query: request.query, sources }))
}

async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let user = identity(&state, &headers);
    if !state.documents.remove(&user.user_id, id).await {
        return Err(AppError::NotFound(format!("document {id}")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
