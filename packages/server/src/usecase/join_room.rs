//! UseCase: Room 参加処理

use std::sync::Arc;

use tsunagi_shared::time::Clock;

use crate::domain::{ConnectionId, MessagePusher, RoomId, RoomRepository, Timestamp};

use super::error::JoinRoomError;

/// Room 参加のユースケース
pub struct JoinRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// 接続を Room に参加させる
    ///
    /// Room がまだ作成されていなくても参加は受け付けます（作成前に届いたメッセージも受信できるように）。
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - 新たに参加した
    /// * `Ok(false)` - 既に参加していた
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<bool, JoinRoomError> {
        let now = Timestamp::new(self.clock.now_millis());
        if let Err(e) = self.repository.touch(&room_id, now).await {
            tracing::warn!("Failed to refresh room '{}': {}", room_id.as_str(), e);
        }

        let joined = self
            .message_pusher
            .join(room_id.clone(), connection_id)
            .await
            .map_err(|e| JoinRoomError::ConnectionNotRegistered(e.to_string()))?;
        tracing::debug!(
            "Connection '{}' joined room '{}' (new: {})",
            connection_id.as_str(),
            room_id.as_str(),
            joined
        );
        Ok(joined)
    }
}
