//! UseCase: Room 作成処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CreateRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 両方の参加者が独立に Room 作成を要求しても、Room は 1 つだけ作られる必要がある
//! - WebSocket 経由と HTTP フォールバック経由のどちらからも同じ結果になる必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規作成、既存 Room の再取得
//! - 異常系：Repository の障害

use std::sync::Arc;

use tsunagi_shared::time::Clock;

use crate::domain::{Room, RoomRepository, RoomUpsert, Timestamp, UserId};

use super::error::CreateRoomError;

/// Room 作成（冪等）のユースケース
pub struct CreateRoomUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// 時刻の取得元
    clock: Arc<dyn Clock>,
}

impl CreateRoomUseCase {
    /// 新しい CreateRoomUseCase を作成
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Room 作成を実行
    ///
    /// 同じペアの Room が既に存在する場合は、その Room を返し最終アクティビティ時刻を更新します。
    ///
    /// # Arguments
    ///
    /// * `user_id` - 作成を要求したユーザー
    /// * `target_id` - チャット相手のユーザー
    pub async fn execute(
        &self,
        user_id: UserId,
        target_id: UserId,
    ) -> Result<RoomUpsert, CreateRoomError> {
        let now = Timestamp::new(self.clock.now_millis());
        let room = Room::for_pair(user_id, target_id, now);

        let upsert = self
            .repository
            .create_or_touch(room)
            .await
            .map_err(|e| CreateRoomError::RepositoryError(e.to_string()))?;

        if upsert.created {
            tracing::info!("Room '{}' created", upsert.room.id.as_str());
        } else {
            tracing::info!("Room '{}' reused", upsert.room.id.as_str());
        }
        Ok(upsert)
    }
}
