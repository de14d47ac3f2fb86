//! WebSocket connection handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tsunagi_shared::protocol::{ClientFrame, KickReason, ServerFrame};

use crate::{
    domain::{ConnectionId, MessageContent, RoomId, UserId},
    ui::state::AppState,
};

/// How long queued frames may take to flush after the client side ended.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if !state.is_authorized(authorization, query.token.as_deref()) {
        tracing::warn!("Rejected unauthorized connection for '{}'", query.user_id);
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Convert String -> UserId (Domain Model)
    let user_id = match UserId::try_from(query.user_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid user_id: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Spawns a task that receives frames from the rx channel and pushes them to the WebSocket sender.
///
/// The task ends once every sender of the channel is dropped (the connection was
/// unregistered), after flushing what is queued and sending a close frame.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    })
}

/// What the receive loop should do after a frame.
enum FrameOutcome {
    Continue,
    Kick(KickReason),
}

/// Per-connection context for frame handling.
struct ConnectionContext {
    state: Arc<AppState>,
    user_id: UserId,
    connection_id: ConnectionId,
}

impl ConnectionContext {
    async fn push(&self, frame: &ServerFrame) {
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize frame: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .state
            .message_pusher
            .push_to(&self.connection_id, &json)
            .await
        {
            tracing::warn!("Failed to push frame: {}", e);
        }
    }

    fn claims(&self, user_id: &str) -> bool {
        if user_id == self.user_id.as_str() {
            return true;
        }
        tracing::warn!(
            "Connection '{}' of '{}' sent a frame as '{}'",
            self.connection_id.as_str(),
            self.user_id.as_str(),
            user_id
        );
        false
    }

    async fn handle_frame(&self, frame: ClientFrame) -> FrameOutcome {
        match frame {
            ClientFrame::CreateRoom {
                request_id,
                user_id,
                target_id,
            } => {
                if !self.claims(&user_id) {
                    return FrameOutcome::Kick(KickReason::Unauthorized);
                }
                let ack = match UserId::try_from(target_id) {
                    Ok(target_id) => match self
                        .state
                        .create_room_usecase
                        .execute(self.user_id.clone(), target_id)
                        .await
                    {
                        Ok(upsert) => ServerFrame::Ack {
                            request_id,
                            success: true,
                            room_id: Some(upsert.room.id.into_string()),
                            error: None,
                        },
                        Err(e) => ServerFrame::Ack {
                            request_id,
                            success: false,
                            room_id: None,
                            error: Some(e.to_string()),
                        },
                    },
                    Err(e) => ServerFrame::Ack {
                        request_id,
                        success: false,
                        room_id: None,
                        error: Some(e.to_string()),
                    },
                };
                self.push(&ack).await;
            }
            ClientFrame::JoinRoom { room_id } => match RoomId::try_from(room_id) {
                Ok(room_id) => {
                    if let Err(e) = self
                        .state
                        .join_room_usecase
                        .execute(&self.connection_id, room_id)
                        .await
                    {
                        tracing::warn!("Failed to join room: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Invalid room id in join-room: {}", e),
            },
            ClientFrame::LeaveRoom { room_id } => match RoomId::try_from(room_id) {
                Ok(room_id) => {
                    self.state
                        .leave_room_usecase
                        .execute(&self.connection_id, &room_id)
                        .await;
                }
                Err(e) => tracing::warn!("Invalid room id in leave-room: {}", e),
            },
            ClientFrame::SendMessage {
                room_id,
                user_id,
                content,
                timestamp,
            } => {
                if !self.claims(&user_id) {
                    return FrameOutcome::Kick(KickReason::Unauthorized);
                }
                let (room_id, content) =
                    match (RoomId::try_from(room_id), MessageContent::try_from(content)) {
                        (Ok(room_id), Ok(content)) => (room_id, content),
                        (Err(e), _) | (_, Err(e)) => {
                            tracing::warn!("Dropping invalid message: {}", e);
                            return FrameOutcome::Continue;
                        }
                    };
                let relayed = ServerFrame::Message {
                    room_id: room_id.as_str().to_string(),
                    user_id,
                    content: content.into_string(),
                    timestamp,
                };
                match serde_json::to_string(&relayed) {
                    Ok(json) => {
                        self.state
                            .send_message_usecase
                            .execute(&self.connection_id, &room_id, &json)
                            .await;
                    }
                    Err(e) => tracing::error!("Failed to serialize message: {}", e),
                }
            }
        }
        FrameOutcome::Continue
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (mut sender, mut receiver) = socket.split();

    // Create a channel for this connection to receive frames
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = state
        .connect_participant_usecase
        .execute(&user_id, tx)
        .await;

    // Tell the client which connection id it got
    let welcome = ServerFrame::Welcome {
        connection_id: connection_id.as_str().to_string(),
    };
    match serde_json::to_string(&welcome) {
        Ok(json) => {
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                tracing::error!("Failed to send welcome to '{}': {}", user_id.as_str(), e);
                state
                    .disconnect_participant_usecase
                    .execute(&connection_id)
                    .await;
                return;
            }
        }
        Err(e) => tracing::error!("Failed to serialize welcome: {}", e),
    }

    let context = ConnectionContext {
        state: state.clone(),
        user_id,
        connection_id: connection_id.clone(),
    };

    // Spawn a task to receive frames from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received frame: {}", text);
                    let frame = match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("Failed to parse frame as JSON: {}", e);
                            continue;
                        }
                    };
                    if let FrameOutcome::Kick(reason) = context.handle_frame(frame).await {
                        context.push(&ServerFrame::Kicked { reason }).await;
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::info!(
                        "Connection '{}' requested close",
                        context.connection_id.as_str()
                    );
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // Spawn a task to push frames from other connections to this connection
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, stop the other
    let send_finished = tokio::select! {
        _ = &mut recv_task => false,
        _ = &mut send_task => {
            recv_task.abort();
            true
        }
    };

    // Unregistering drops the channel sender, which lets the push task drain and close
    state
        .disconnect_participant_usecase
        .execute(&connection_id)
        .await;

    if !send_finished && tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
}
