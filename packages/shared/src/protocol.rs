//! Wire protocol between the signaling client and server.
//!
//! WebSocket frames are JSON text messages tagged by `type`
//! (e.g. `{"type":"create-room","requestId":1,...}`). HTTP bodies for the
//! stateless room-creation fallback live here too so both sides agree on
//! field names.

use serde::{Deserialize, Serialize};

/// HTTP path of the stateless room-creation endpoint.
pub const CREATE_CHAT_PATH: &str = "/api/chats/create";

/// Frames sent from a client to the signaling server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Create (or look up) the room for a participant pair. Answered by `Ack`.
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        request_id: u64,
        user_id: String,
        target_id: String,
    },

    /// Subscribe this connection to a room.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },

    /// Unsubscribe this connection from a room.
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: String },

    /// Broadcast a message to the other members of a room.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        room_id: String,
        user_id: String,
        content: String,
        timestamp: i64,
    },
}

/// Frames sent from the signaling server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// First frame after the upgrade; carries the server-assigned connection id.
    #[serde(rename_all = "camelCase")]
    Welcome { connection_id: String },

    /// Acknowledgement of a request carrying `request_id`.
    #[serde(rename_all = "camelCase")]
    Ack {
        request_id: u64,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A message broadcast to a room this connection has joined.
    #[serde(rename_all = "camelCase")]
    Message {
        room_id: String,
        user_id: String,
        content: String,
        timestamp: i64,
    },

    /// The server is closing this connection on purpose.
    Kicked { reason: KickReason },
}

/// Why the server closed a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KickReason {
    /// Credentials are missing, invalid or do not match the frames sent.
    Unauthorized,
    /// The server is shutting down.
    ShuttingDown,
}

/// Request body of `POST /api/chats/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub user_id: String,
    pub target_id: String,
}

/// Response body of `POST /api/chats/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
