//! Message Relay
//!
//! Room-scoped join/leave/send on top of the [`ConnectionManager`], plus
//! per-room subscriptions for inbound messages.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tsunagi_shared::{protocol::ClientFrame, time::Clock};

use crate::connection::{ConnectionManager, lock};

/// A message exchanged in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub room_id: String,
    pub user_id: String,
    pub content: String,
    /// Unix timestamp (milliseconds) set by the sender
    pub timestamp: i64,
}

#[derive(Default)]
struct RoomBookInner {
    joined: BTreeSet<String>,
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<ChatMessage>>>,
}

/// Joined rooms and message subscribers.
///
/// Owned by the connection manager, which replays the joined set after a
/// reconnect and feeds inbound messages to the subscribers.
#[derive(Default)]
pub(crate) struct RoomBook {
    inner: Mutex<RoomBookInner>,
}

impl RoomBook {
    pub(crate) fn is_joined(&self, room_id: &str) -> bool {
        lock(&self.inner).joined.contains(room_id)
    }

    /// Returns `true` if the room was not joined before.
    pub(crate) fn mark_joined(&self, room_id: &str) -> bool {
        lock(&self.inner).joined.insert(room_id.to_string())
    }

    /// Returns `true` if the room was joined.
    pub(crate) fn mark_left(&self, room_id: &str) -> bool {
        lock(&self.inner).joined.remove(room_id)
    }

    pub(crate) fn joined(&self) -> Vec<String> {
        lock(&self.inner).joined.iter().cloned().collect()
    }

    pub(crate) fn clear_joined(&self) {
        lock(&self.inner).joined.clear();
    }

    pub(crate) fn subscribe(&self, room_id: &str) -> mpsc::UnboundedReceiver<ChatMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner)
            .subscribers
            .entry(room_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Hand a message to the room's subscribers, dropping closed ones.
    pub(crate) fn deliver(&self, message: ChatMessage) -> usize {
        let mut inner = lock(&self.inner);
        let Some(subscribers) = inner.subscribers.get_mut(&message.room_id) else {
            return 0;
        };
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            inner.subscribers.remove(&message.room_id);
        }
        delivered
    }
}

/// Join, leave and send within rooms.
pub struct MessageRelay {
    connection: Arc<ConnectionManager>,
    clock: Arc<dyn Clock>,
}

impl MessageRelay {
    pub fn new(connection: Arc<ConnectionManager>, clock: Arc<dyn Clock>) -> Self {
        Self { connection, clock }
    }

    /// Join a room. Needs a live connection; joining twice is a no-op.
    pub fn join_room(&self, room_id: &str) -> bool {
        if !self.connection.is_connected() {
            tracing::debug!("Cannot join '{}' while disconnected", room_id);
            return false;
        }
        let rooms = self.connection.rooms();
        if rooms.is_joined(room_id) {
            return true;
        }
        let frame = ClientFrame::JoinRoom {
            room_id: room_id.to_string(),
        };
        if !self.connection.send(frame) {
            return false;
        }
        rooms.mark_joined(room_id);
        tracing::info!("Joined room '{}'", room_id);
        true
    }

    /// Leave a room.
    ///
    /// Leaving a room that was never joined succeeds. Local state is cleared
    /// even when no connection can carry the leave, in which case this
    /// returns `false`.
    pub fn leave_room(&self, room_id: &str) -> bool {
        if !self.connection.rooms().mark_left(room_id) {
            return true;
        }
        let sent = self.connection.send(ClientFrame::LeaveRoom {
            room_id: room_id.to_string(),
        });
        if sent {
            tracing::info!("Left room '{}'", room_id);
        } else {
            tracing::warn!("Left room '{}' locally, server not reachable", room_id);
        }
        sent
    }

    /// Send a message to a room, stamped with the current time.
    pub fn send_message(&self, room_id: &str, content: &str, user_id: &str) -> bool {
        if !self.connection.is_connected() {
            tracing::debug!("Cannot send to '{}' while disconnected", room_id);
            return false;
        }
        self.connection.send(ClientFrame::SendMessage {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            timestamp: self.clock.now_millis(),
        })
    }

    /// Receive the messages other participants send to `room_id`, in arrival order.
    pub fn subscribe(&self, room_id: &str) -> mpsc::UnboundedReceiver<ChatMessage> {
        self.connection.rooms().subscribe(room_id)
    }

    pub fn joined_rooms(&self) -> Vec<String> {
        self.connection.rooms().joined()
    }
}
