//! UseCase: 参加者接続処理
//!
//! 同じユーザーが複数の接続（複数タブなど）を持つことは許可します。
//! 接続ごとにサーバーが新しい接続 ID を割り当てます。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, PusherChannel, UserId};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `user_id` - 接続したユーザーの ID（Domain Model）
    /// * `sender` - クライアントへのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// 割り当てた接続 ID
    pub async fn execute(&self, user_id: &UserId, sender: PusherChannel) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        self.message_pusher
            .register_client(connection_id.clone(), sender)
            .await;
        tracing::info!(
            "User '{}' connected as '{}'",
            user_id.as_str(),
            connection_id.as_str()
        );
        connection_id
    }
}
