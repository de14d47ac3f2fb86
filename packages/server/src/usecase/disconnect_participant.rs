//! UseCase: 参加者切断処理

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomId};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 参加者切断を実行
    ///
    /// 送信チャンネルは登録解除と同時に破棄されるため、
    /// 送信タスクは残りのメッセージを送り終えた後に終了します。
    ///
    /// # Returns
    ///
    /// 切断した接続が参加していた Room の一覧
    pub async fn execute(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let left = self.message_pusher.unregister_client(connection_id).await;
        tracing::info!(
            "Connection '{}' disconnected (was in {} rooms)",
            connection_id.as_str(),
            left.len()
        );
        left
    }
}
