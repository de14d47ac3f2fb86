//! UseCase: Room 一覧・詳細の取得

use std::sync::Arc;

use crate::domain::{Room, RoomId, RoomRepository};

use super::error::GetRoomDetailError;

/// Room 一覧取得のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// 全ての Room を Room ID 順に返す。取得に失敗した場合は空の一覧
    pub async fn execute(&self) -> Vec<Room> {
        match self.repository.list().await {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::warn!("Failed to list rooms: {}", e);
                Vec::new()
            }
        }
    }
}

/// Room 詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: String) -> Result<Room, GetRoomDetailError> {
        let room_id = RoomId::new(room_id).map_err(|_| GetRoomDetailError::RoomNotFound)?;
        self.repository
            .find(&room_id)
            .await
            .map_err(|_| GetRoomDetailError::RepositoryError)?
            .ok_or(GetRoomDetailError::RoomNotFound)
    }
}
