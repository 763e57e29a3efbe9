//! WebSocket endpoint for the real-time channel.
//!
//! One long-lived socket per client carrying JSON text frames both ways.
//! The socket task owns the sink; everything outbound flows through the
//! hub's per-connection channel so broadcasts never block a handler.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AppState;
use crate::events::{ClientMessage, ServerEvent};
use crate::hub::{Hub, Outbound};

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (member, mut rx) = state.hub.connect();
    let member_id = member.id;
    info!("WebSocket connection {} opened", member_id);

    // Connect-time sync: greet the new socket and hand it the current
    // maintenance snapshot before any broadcast can reach it.
    state.hub.send_to(
        member_id,
        &ServerEvent::Connected {
            message: "Welcome".to_string(),
        },
    );
    state
        .hub
        .send_to(member_id, &ServerEvent::Maintenance(state.maintenance.snapshot()));

    let send_task = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            match out {
                Outbound::Event(frame) => {
                    if sender.send(Message::Text(frame.as_str().into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let hub = state.hub.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_message(&hub, member_id, text.as_str()),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Either half finishing means the connection is done.
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.hub.disconnect(member_id);
    debug!("WebSocket connection {} closed", member_id);
}

fn handle_client_message(hub: &Arc<Hub>, member_id: Uuid, raw: &str) {
    let msg: ClientMessage = match serde_json::from_str(raw) {
        Ok(msg) => msg,
        Err(_) => {
            debug!("Ignoring unrecognized frame from {}", member_id);
            return;
        }
    };

    match msg {
        ClientMessage::SetUsername { username } => {
            hub.set_username(member_id, &username);
        }
        ClientMessage::Typing { question_id } => {
            if let Some(member) = hub.member(member_id) {
                hub.broadcast(
                    &ServerEvent::Typing {
                        question_id,
                        username: member.display_name().to_string(),
                    },
                    Some(member_id),
                );
            }
        }
    }
}
