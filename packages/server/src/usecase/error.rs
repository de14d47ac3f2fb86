//! UseCase 層のエラー型

use thiserror::Error;

/// Room 作成のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateRoomError {
    #[error("Repository error: {0}")]
    RepositoryError(String),
}

/// Room 参加のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    /// 接続が MessagePusher に登録されていない
    #[error("Connection is not registered: {0}")]
    ConnectionNotRegistered(String),
}

/// Room 詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Repository error")]
    RepositoryError,
}
