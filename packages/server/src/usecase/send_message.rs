//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 送信者以外の Room メンバーにだけメッセージが届くことを保証する
//! - Room の最終アクティビティ時刻が更新されることを確認する
//!
//! ### どのような状況を想定しているか
//! - 正常系：Room メンバーへのブロードキャスト
//! - エッジケース：送信者しか参加していない Room（ブロードキャスト対象なし）

use std::sync::Arc;

use tsunagi_shared::time::Clock;

use crate::domain::{ConnectionId, MessagePusher, RoomId, RoomRepository, Timestamp};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
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

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `from` - 送信元の接続 ID
    /// * `room_id` - 送信先の Room
    /// * `json_message` - 送信する JSON メッセージ（UI 層で生成されたもの）
    ///
    /// # Returns
    ///
    /// メッセージを届けた接続の数
    pub async fn execute(&self, from: &ConnectionId, room_id: &RoomId, json_message: &str) -> usize {
        let now = Timestamp::new(self.clock.now_millis());
        if let Err(e) = self.repository.touch(room_id, now).await {
            tracing::warn!("Failed to refresh room '{}': {}", room_id.as_str(), e);
        }

        let delivered = self
            .message_pusher
            .broadcast_to_room(room_id, from, json_message)
            .await;
        tracing::debug!(
            "Relayed message from '{}' to {} members of '{}'",
            from.as_str(),
            delivered,
            room_id.as_str()
        );
        delivered
    }
}
