//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。Room の削除（古い Room の掃除）は行いません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, Room, RoomId, RoomRepository, RoomUpsert, Timestamp};

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    /// Room ID → Room
    rooms: Arc<Mutex<HashMap<RoomId, Room>>>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn find(&self, room_id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(room_id).cloned())
    }

    async fn create_or_touch(&self, room: Room) -> Result<RoomUpsert, RepositoryError> {
        let mut rooms = self.rooms.lock().await;

        if let Some(existing) = rooms.get_mut(&room.id) {
            existing.touch(room.last_activity_at);
            tracing::debug!("Room '{}' already exists, refreshed", existing.id.as_str());
            return Ok(RoomUpsert {
                room: existing.clone(),
                created: false,
            });
        }

        tracing::debug!("Room '{}' created", room.id.as_str());
        rooms.insert(room.id.clone(), room.clone());
        Ok(RoomUpsert {
            room,
            created: true,
        })
    }

    async fn touch(&self, room_id: &RoomId, at: Timestamp) -> Result<bool, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(room_id) {
            Some(room) => {
                room.touch(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<Room>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }
}
