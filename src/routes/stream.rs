//! WebSocket task stream.
//!
//! Every connection subscribes to the global event feed; any client sees all
//! task events, matching the chat UI's single shared board. Inbound
//! `submit-task` messages each spawn one orchestrator whose private event
//! channel is bridged into the broadcast feed and, when a chat id is given,
//! into persistence.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agents::{OrchestratorContext, TaskOrchestrator};
use crate::auth::{self, UserIdentity};
use crate::db::{ChatStore, NewMessage};
use crate::events::{ClientEvent, TaskEvent};
use crate::models::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/stream", get(websocket_handler))
        .with_state(state)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let user = auth::identity_from_header(header, &state.config.auth.secret);
    info!(user = %user.user_id, "WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: UserIdentity) {
    let (mut sender, mut receiver) = socket.split();
    let mut feed = state.events.subscribe();

    // Outbound: forward the broadcast feed to this client.
    let mut sender_task = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize task event");
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "WebSocket client lagged behind the event feed");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Inbound: each submit-task spawns an independent orchestrator run.
    let inbound_state = state.clone();
    let mut receiver_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::SubmitTask { request, chat_id }) => {
                        spawn_task(inbound_state.clone(), user.clone(), request, chat_id);
                    }
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed client message");
                    }
                },
                Message::Close(_) => {
                    debug!("Client closed WebSocket connection");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut sender_task => receiver_task.abort(),
        _ = &mut receiver_task => sender_task.abort(),
    }
    debug!("WebSocket connection ended");
}

/// Run one task in the background, bridging its private event channel into
/// the global broadcast feed and fire-and-forget persistence.
fn spawn_task(state: AppState, user: UserIdentity, request: String, chat_id: Option<Uuid>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let ctx = OrchestratorContext {
        dataset: state.dataset.clone(),
        narrative: state.narrative.clone(),
        events: tx,
        step_delay: Duration::from_millis(state.config.orchestrator.progress_step_ms),
    };

    let store = state.chat_store();
    let user_store = store.clone();
    let feed = state.events.clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if event.is_terminal() {
                if let (Some(store), Some(chat_id)) = (&store, chat_id) {
                    persist_outcome(store, chat_id, &event).await;
                }
            }
            // No subscribers is fine; events are telemetry here.
            let _ = feed.send(event);
        }
    });

    let documents = state.documents.clone();
    tokio::spawn(async move {
        info!(user = %user.user_id, "Task submitted");

        if let (Some(store), Some(chat_id)) = (&user_store, chat_id) {
            let message = NewMessage {
                body: request.clone(),
                is_user: true,
                agents: None,
                results: None,
            };
            if let Err(e) = store.add_message(chat_id, message).await {
                warn!(chat_id = %chat_id, error = %e, "Failed to persist request message");
            }
        }

        let doc_context = documents.context_for(&user.user_id, &request).await;
        let orchestrator = TaskOrchestrator::new(ctx);
        // Failures already produced a task-error event.
        let _ = orchestrator.run(&request, doc_context.as_deref()).await;
    });
}

/// Record the terminal event as an assistant message. Persistence failures
/// are logged and never affect the task outcome.
async fn persist_outcome(store: &ChatStore, chat_id: Uuid, event: &TaskEvent) {
    let message = match event {
        TaskEvent::TaskCompleted { result, .. } => NewMessage {
            body: result.summary.clone(),
            is_user: false,
            agents: serde_json::to_value(&result.agents).ok(),
            results: serde_json::to_value(result).ok(),
        },
        TaskEvent::TaskError { error, .. } => NewMessage {
            body: format!("Error: {error}"),
            is_user: false,
            agents: None,
            results: None,
        },
        _ => return,
    };

    match store.add_message(chat_id, message).await {
        Ok(Some(_)) => debug!(chat_id = %chat_id, "Task outcome persisted"),
        Ok(None) => warn!(chat_id = %chat_id, "Chat not found, outcome dropped"),
        Err(e) => warn!(chat_id = %chat_id, error = %e, "Failed to persist task outcome"),
    }
}
