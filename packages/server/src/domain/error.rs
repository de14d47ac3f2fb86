//! Domain 層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    /// 空文字列は許可されない
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// 最大長を超えている
    #[error("{field} is too long ({len} > {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// 指定された Room が存在しない
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    /// ストレージ側の障害
    #[error("Storage error: {0}")]
    Storage(String),
}

/// メッセージ送信（通知）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    /// 接続が登録されていない
    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),

    /// 送信チャンネルが閉じている
    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
