//! UseCase: Room 退出処理

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomId};

/// Room 退出のユースケース
pub struct LeaveRoomUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 接続を Room から退出させる。参加していなかった場合は何もしない
    pub async fn execute(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        let left = self.message_pusher.leave(room_id, connection_id).await;
        tracing::debug!(
            "Connection '{}' left room '{}' (was member: {})",
            connection_id.as_str(),
            room_id.as_str(),
            left
        );
        left
    }
}
