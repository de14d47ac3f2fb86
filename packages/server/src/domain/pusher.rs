//! MessagePusher trait 定義
//!
//! クライアントへのメッセージ送信（通知）と、Room 単位の購読状態を抽象化します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, RoomId, error::MessagePushError};

/// クライアントへの送信チャンネル（JSON テキストを送る）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// メッセージ送信の抽象化
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続を登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の登録を解除し、購読していた Room の一覧を返す
    async fn unregister_client(&self, connection_id: &ConnectionId) -> Vec<RoomId>;

    /// 特定の接続にメッセージを送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 接続を Room に参加させる。新たに参加した場合は `true`
    async fn join(
        &self,
        room_id: RoomId,
        connection_id: &ConnectionId,
    ) -> Result<bool, MessagePushError>;

    /// 接続を Room から退出させる。参加していた場合は `true`
    async fn leave(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool;

    /// Room の参加者（`exclude` を除く）にブロードキャストし、送信できた数を返す
    async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        exclude: &ConnectionId,
        content: &str,
    ) -> usize;
}
