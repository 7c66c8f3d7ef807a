//! Live message fan-out over WebSocket.
//!
//! `GET /conversations/:id/ws?token=...`: browsers cannot set an
//! Authorization header on a WebSocket handshake, so the bearer token rides
//! in the query string. Membership is checked before the socket joins the
//! registry; refused connections complete the upgrade and close with the
//! policy-violation code so the client can tell auth failure from a drop.

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::db::Conversation;
use crate::AppState;

use super::auth::decode_access_token;

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// Wire shape of a fanned-out chat message.
pub fn ws_payload(message: &crate::db::Message) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "id": message.id,
        "conversation_id": message.conversation_id,
        "sender_id": message.sender_id,
        "content": message.content,
        "file_url": message.file_url,
        "created_at": message.created_at,
    })
}

/// Verify the token and that its user is a participant of the conversation.
async fn authorize_subscriber(
    state: &AppState,
    conversation_id: &str,
    query: &WsAuthQuery,
) -> Result<(), &'static str> {
    let token = query.token.as_deref().ok_or("Missing token")?;
    let claims = decode_access_token(&state.config.auth.jwt_secret, token)
        .ok_or("Could not validate credentials")?;

    let conversation = Conversation::find(&state.db, conversation_id)
        .await
        .map_err(|_| "Could not load conversation")?
        .ok_or("Not a participant of this conversation")?;

    if !conversation.is_participant(&claims.sub) {
        return Err("Not a participant of this conversation");
    }
    Ok(())
}

pub async fn conversation_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(query): Query<WsAuthQuery>,
) -> impl IntoResponse {
    match authorize_subscriber(&state, &conversation_id, &query).await {
        Ok(()) => {
            ws.on_upgrade(move |socket| handle_subscription(socket, state, conversation_id))
        }
        Err(reason) => ws.on_upgrade(move |socket| refuse(socket, reason)),
    }
}

/// Refused connections get an explicit policy-violation close, never a
/// silent drop.
async fn refuse(mut socket: WebSocket, reason: &'static str) {
    let _ = socket
        .send(WsMessage::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: reason.into(),
        })))
        .await;
}

async fn handle_subscription(socket: WebSocket, state: Arc<AppState>, conversation_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle_id = state.registry.join(&conversation_id, tx);
    tracing::debug!(
        conversation_id = %conversation_id,
        handle_id = %handle_id,
        "Chat subscriber joined"
    );

    loop {
        tokio::select! {
            // Payloads fanned out through the registry
            payload = rx.recv() => {
                match payload {
                    Some(payload) => {
                        if sender.send(WsMessage::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Clients send nothing but keepalives and close
            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Ping(data))) => {
                        if sender.send(WsMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    state.registry.leave(&conversation_id, handle_id);
    tracing::debug!(
        conversation_id = %conversation_id,
        handle_id = %handle_id,
        "Chat subscriber left"
    );
}
