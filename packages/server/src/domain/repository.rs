//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{Room, RoomId, Timestamp, error::RepositoryError};

/// `create_or_touch` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomUpsert {
    /// 保存後の Room
    pub room: Room,
    /// 新規作成された場合は `true`、既存 Room を更新した場合は `false`
    pub created: bool,
}

/// Room Repository trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Room を ID で取得
    async fn find(&self, room_id: &RoomId) -> Result<Option<Room>, RepositoryError>;

    /// Room を作成する。既に存在する場合は既存の Room の最終アクティビティ時刻を更新して返す（冪等）
    async fn create_or_touch(&self, room: Room) -> Result<RoomUpsert, RepositoryError>;

    /// 既存 Room の最終アクティビティ時刻を更新する。Room が存在しない場合は `false`
    async fn touch(&self, room_id: &RoomId, at: Timestamp) -> Result<bool, RepositoryError>;

    /// 全ての Room を取得
    async fn list(&self) -> Result<Vec<Room>, RepositoryError>;
}
