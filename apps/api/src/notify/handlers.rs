use std::borrow::Cow;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Audience, ConnectionRegistry, PushChannel, PushEvent};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct MessageQuery {
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct PushTestResponse {
    pub event_type: String,
    pub receivers: usize,
}

/// GET /ws/notifications/:user_id?token=
/// Token verification belongs to the auth layer; a missing token closes with 1008.
pub async fn handle_notifications_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<TokenQuery>,
) -> impl IntoResponse {
    let admitted = admits_token(params.token.as_deref());
    let registry = state.registry.clone();

    ws.on_upgrade(move |socket| async move {
        if admitted {
            run_session(socket, user_id, registry).await;
        } else {
            reject(socket, user_id).await;
        }
    })
}

fn admits_token(token: Option<&str>) -> bool {
    token.is_some_and(|t| !t.trim().is_empty())
}

fn welcome_frame() -> Result<String, serde_json::Error> {
    PushEvent::new("connection_established", "Connected to the notification service").to_json()
}

/// Acknowledges a client message by echoing it back.
fn echo_frame(text: String) -> Result<String, serde_json::Error> {
    PushEvent::new("message_received", text).to_json()
}

fn policy_close() -> CloseFrame<'static> {
    CloseFrame {
        code: close_code::POLICY,
        reason: Cow::from("missing token"),
    }
}

async fn reject(mut socket: WebSocket, user_id: Uuid) {
    warn!(%user_id, "Push connection without token rejected");
    let _ = socket.send(Message::Close(Some(policy_close()))).await;
}

async fn run_session(socket: WebSocket, user_id: Uuid, registry: ConnectionRegistry) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    if let Ok(json) = welcome_frame() {
        if sender.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    let session_id = registry.register(user_id, tx.clone()).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    debug!(%user_id, %session_id, "Push client message received");
                    let Ok(json) = echo_frame(text) else { break };
                    if tx.send(json).is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    registry.unregister(user_id, session_id).await;
    info!(%user_id, %session_id, "Push session closed");
}

/// POST /ws/notification-test/:user_id
pub async fn handle_notification_test(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<MessageQuery>,
) -> Result<Json<PushTestResponse>, AppError> {
    let event = PushEvent::new(
        "test_notification",
        params
            .message
            .unwrap_or_else(|| "This is a test notification".to_string()),
    )
    .with("timestamp", Utc::now().to_rfc3339());

    let receivers = state
        .registry
        .push(Audience::User { user_id }, &event)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(PushTestResponse {
        event_type: event.kind,
        receivers,
    }))
}

/// POST /ws/broadcast-test
pub async fn handle_broadcast_test(
    State(state): State<AppState>,
    Query(params): Query<MessageQuery>,
) -> Result<Json<PushTestResponse>, AppError> {
    let event = PushEvent::new(
        "broadcast",
        params
            .message
            .unwrap_or_else(|| "This is a broadcast notification".to_string()),
    )
    .with("timestamp", Utc::now().to_rfc3339());

    let receivers = state
        .registry
        .push(Audience::Everyone, &event)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(PushTestResponse {
        event_type: event.kind,
        receivers,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_blank_or_missing_token_is_refused() {
        assert!(!admits_token(None));
        assert!(!admits_token(Some("")));
        assert!(!admits_token(Some("   ")));
        assert!(admits_token(Some("abc")));
    }

    #[test]
    fn test_welcome_announces_connection() {
        let welcome: Value = serde_json::from_str(&welcome_frame().unwrap()).unwrap();
        assert_eq!(welcome["type"], "connection_established");
    }

    #[test]
    fn test_echo_carries_original_text() {
        let frame = echo_frame("ping {\"a\":1}".to_string()).unwrap();
        let echo: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(echo["type"], "message_received");
        assert_eq!(echo["message"], "ping {\"a\":1}");
    }

    #[test]
    fn test_rejection_uses_policy_violation_code() {
        let frame = policy_close();
        assert_eq!(frame.code, 1008);
        assert_eq!(frame.reason, "missing token");
    }
}
