//! WebSocket sessions driving a query coordinator.
//!
//! Each connection gets its own coordinator. Client messages map onto
//! coordinator operations; every state change is pushed back as a
//! snapshot.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use cinecache_core::{ListState, QueryCoordinator};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_RECEIVED, WS_STATES_SENT,
};
use crate::state::AppState;

/// Message sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The search field changed.
    QueryChanged { query: String },
    /// The user pressed search.
    Submit { query: String },
    /// Pull-to-refresh.
    Refresh,
    Retry,
    SelectHistory { query: String },
    DeleteHistory { query: String },
    ClearHistory,
    /// The search field gained or lost focus.
    Focus { focused: bool },
}

impl ClientMessage {
    fn label(&self) -> &'static str {
        match self {
            ClientMessage::QueryChanged { .. } => "query_changed",
            ClientMessage::Submit { .. } => "submit",
            ClientMessage::Refresh => "refresh",
            ClientMessage::Retry => "retry",
            ClientMessage::SelectHistory { .. } => "select_history",
            ClientMessage::DeleteHistory { .. } => "delete_history",
            ClientMessage::ClearHistory => "clear_history",
            ClientMessage::Focus { .. } => "focus",
        }
    }

    fn apply(self, coordinator: &QueryCoordinator) {
        match self {
            ClientMessage::QueryChanged { query } => coordinator.on_query_changed(&query),
            ClientMessage::Submit { query } => coordinator.submit(&query),
            ClientMessage::Refresh => coordinator.refresh(),
            ClientMessage::Retry => coordinator.retry(),
            ClientMessage::SelectHistory { query } => coordinator.select_history(&query),
            ClientMessage::DeleteHistory { query } => coordinator.delete_history(&query),
            ClientMessage::ClearHistory => coordinator.clear_history(),
            ClientMessage::Focus { focused } => coordinator.set_search_focus(focused),
        }
    }
}

/// List state plus the flags a client derives from it.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    #[serde(flatten)]
    pub state: ListState,
    pub is_search_active: bool,
    pub should_show_error: bool,
    pub is_empty: bool,
}

impl From<&ListState> for StateSnapshot {
    fn from(state: &ListState) -> Self {
        Self {
            is_search_active: state.is_search_active(),
            should_show_error: state.should_show_error(),
            is_empty: state.is_empty(),
            state: state.clone(),
        }
    }
}

/// Message pushed to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    State(StateSnapshot),
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket session.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let coordinator = state.new_coordinator();
    let mut updates = coordinator.subscribe();
    coordinator.start();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket session started");

    // Push every state change to this client
    let send_task = tokio::spawn(async move {
        loop {
            let message = {
                let current = updates.borrow_and_update();
                ServerMessage::State(StateSnapshot::from(&*current))
            };

            match serde_json::to_string(&message) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                    WS_STATES_SENT.inc();
                }
                Err(e) => {
                    error!("Failed to serialize state snapshot: {}", e);
                }
            }

            if updates.changed().await.is_err() {
                debug!("Coordinator state channel closed");
                break;
            }
        }
    });

    // Handle incoming messages from client
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => {
                    WS_MESSAGES_RECEIVED
                        .with_label_values(&[message.label()])
                        .inc();
                    debug!("Received {:?}", message);
                    message.apply(&coordinator);
                }
                Err(e) => {
                    warn!("Ignoring malformed client message: {}", e);
                }
            },
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(_) => {
                // Ping/pong handled by axum, binary ignored
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // Clean up
    coordinator.shutdown();
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket session ended");
}
