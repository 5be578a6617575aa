use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::view::JobView;
use crate::state::AppState;
use crate::store::StoreError;
use crate::subscriptions::{SubscriptionKey, SubscriptionManager};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { key: SubscriptionKey },
    Unsubscribe { key: SubscriptionKey },
    UnsubscribeAll,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Snapshot {
        key: SubscriptionKey,
        jobs: Vec<JobView>,
    },
    Unsubscribed {
        key: Option<SubscriptionKey>,
    },
    Error {
        key: Option<SubscriptionKey>,
        code: &'static str,
        message: String,
    },
}

impl ServerFrame {
    fn from_app_error(key: Option<SubscriptionKey>, err: &AppError) -> Self {
        ServerFrame::Error {
            key,
            code: err.code(),
            message: err.to_string(),
        }
    }

    fn from_store_error(key: SubscriptionKey, err: &StoreError) -> Self {
        ServerFrame::Error {
            key: Some(key),
            code: "feed_failed",
            message: err.to_string(),
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, actor))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, actor: Actor) {
    let (mut sender, mut receiver) = socket.split();
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<ServerFrame>();
    let subscriptions = state.engine.subscriptions();

    info!(actor_id = %actor.id, "websocket client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = frames_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize frame for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_loop = async {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    handle_frame(&state, &subscriptions, &actor, &frames_tx, &text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = &mut send_task => {},
        _ = recv_loop => {},
    }

    subscriptions.unsubscribe_all().await;
    send_task.abort();

    info!(actor_id = %actor.id, "websocket client disconnected");
}

async fn handle_frame(
    state: &AppState,
    subscriptions: &SubscriptionManager,
    actor: &Actor,
    frames_tx: &mpsc::UnboundedSender<ServerFrame>,
    text: &str,
) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            let err = AppError::Validation(format!("malformed frame: {err}"));
            let _ = frames_tx.send(ServerFrame::from_app_error(None, &err));
            return;
        }
    };

    match frame {
        ClientFrame::Subscribe { key } => {
            let changes_tx = frames_tx.clone();
            let errors_tx = frames_tx.clone();
            let change_key = key.clone();
            let error_key = key.clone();

            let result = state
                .engine
                .watch(
                    subscriptions,
                    actor,
                    key.clone(),
                    move |jobs| {
                        let _ = changes_tx.send(ServerFrame::Snapshot {
                            key: change_key.clone(),
                            jobs,
                        });
                    },
                    move |err| {
                        let _ = errors_tx.send(ServerFrame::from_store_error(error_key.clone(), &err));
                    },
                )
                .await;

            if let Err(err) = result {
                warn!(actor_id = %actor.id, key = ?key, error = %err, "subscription refused");
                let _ = frames_tx.send(ServerFrame::from_app_error(Some(key), &err));
            }
        }
        ClientFrame::Unsubscribe { key } => {
            subscriptions.unsubscribe(&key).await;
            let _ = frames_tx.send(ServerFrame::Unsubscribed { key: Some(key) });
        }
        ClientFrame::UnsubscribeAll => {
            subscriptions.unsubscribe_all().await;
            let _ = frames_tx.send(ServerFrame::Unsubscribed { key: None });
        }
    }
}
