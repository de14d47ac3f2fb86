//! HTTP API response DTOs.

use serde::Serialize;
use tsunagi_shared::time::timestamp_to_rfc3339;

use crate::domain::Room;

/// Room as returned by `GET /api/rooms` and `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub id: String,
    pub participants: Vec<String>,
    pub created_at: String,
    pub last_activity_at: String,
}

impl From<Room> for RoomDto {
    fn from(room: Room) -> Self {
        Self {
            id: room.id.into_string(),
            participants: room
                .participants
                .into_iter()
                .map(|p| p.into_string())
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            last_activity_at: timestamp_to_rfc3339(room.last_activity_at.value()),
        }
    }
}
