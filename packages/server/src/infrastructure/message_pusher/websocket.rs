//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - WebSocket 接続ごとの `UnboundedSender` を管理
//! - Room ごとの購読者（接続）を管理
//! - 接続へのメッセージ送信（push_to, broadcast_to_room）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! 接続と Room の購読状態は 1 つのロックで管理し、ロック順序の問題を避けます。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel, RoomId};

#[derive(Default)]
struct PusherState {
    /// Key: 接続 ID, Value: 送信チャンネル
    clients: HashMap<ConnectionId, PusherChannel>,
    /// Key: Room ID, Value: 購読中の接続 ID
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    state: Mutex<PusherState>,
}

impl WebSocketMessagePusher {
    /// 新しい WebSocketMessagePusher を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut state = self.state.lock().await;
        tracing::debug!(
            "Connection '{}' registered to MessagePusher",
            connection_id.as_str()
        );
        state.clients.insert(connection_id, sender);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let mut state = self.state.lock().await;
        state.clients.remove(connection_id);

        let mut left = Vec::new();
        state.rooms.retain(|room_id, members| {
            if members.remove(connection_id) {
                left.push(room_id.clone());
            }
            !members.is_empty()
        });

        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher (left {} rooms)",
            connection_id.as_str(),
            left.len()
        );
        left
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let state = self.state.lock().await;

        let sender = state.clients.get(connection_id).ok_or_else(|| {
            MessagePushError::ConnectionNotFound(connection_id.as_str().to_string())
        })?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed message to connection '{}'", connection_id.as_str());
        Ok(())
    }

    async fn join(
        &self,
        room_id: RoomId,
        connection_id: &ConnectionId,
    ) -> Result<bool, MessagePushError> {
        let mut state = self.state.lock().await;

        if !state.clients.contains_key(connection_id) {
            return Err(MessagePushError::ConnectionNotFound(
                connection_id.as_str().to_string(),
            ));
        }
        Ok(state
            .rooms
            .entry(room_id)
            .or_default()
            .insert(connection_id.clone()))
    }

    async fn leave(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let mut state = self.state.lock().await;

        let Some(members) = state.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(connection_id);
        if members.is_empty() {
            state.rooms.remove(room_id);
        }
        removed
    }

    async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        exclude: &ConnectionId,
        content: &str,
    ) -> usize {
        let state = self.state.lock().await;

        let Some(members) = state.rooms.get(room_id) else {
            tracing::debug!("Room '{}' has no members, nothing to broadcast", room_id.as_str());
            return 0;
        };

        let mut delivered = 0;
        for member in members.iter().filter(|member| *member != exclude) {
            match state.clients.get(member) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(sender) => match sender.send(content.to_string()) {
                    Ok(()) => delivered += 1,
                    Err(e) => tracing::warn!(
                        "Failed to push message to connection '{}': {}",
                        member.as_str(),
                        e
                    ),
                },
                None => tracing::warn!(
                    "Connection '{}' not found during broadcast, skipping",
                    member.as_str()
                ),
            }
        }
        delivered
    }
}
