//! Facade bundling the connection manager, room coordinator and message relay.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tsunagi_shared::time::{Clock, SystemClock};

use crate::{
    config::ClientConfig,
    connection::{ConnectionHandle, ConnectionManager, ConnectionStatus},
    coordinator::{CreateRoomOutcome, RoomCoordinator},
    fallback::{HttpRoomFallback, RoomFallback},
    relay::{ChatMessage, MessageRelay},
    storage::KeyValueStore,
    transport::{Connector, WebSocketConnector},
};

/// Chat signaling client.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tsunagi_client::{ChatClient, ClientConfig, storage::FileStore};
///
/// # async fn demo() {
/// let client = ChatClient::new(ClientConfig::default(), Arc::new(FileStore::new(".tsunagi")));
/// client.connect_socket("alice");
/// let room = client.create_chat_room("alice", "bob").await;
/// client.send_message(&room.room_id, "hello", "alice");
/// # }
/// ```
pub struct ChatClient {
    connection: Arc<ConnectionManager>,
    relay: Arc<MessageRelay>,
    coordinator: RoomCoordinator,
}

impl ChatClient {
    /// Client talking WebSocket and HTTP to the servers named in `config`.
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let fallback = Arc::new(HttpRoomFallback::new(config.http_url.clone()));
        Self::with_parts(
            config,
            store,
            Arc::new(WebSocketConnector::new()),
            fallback,
            Arc::new(SystemClock),
        )
    }

    /// Client with explicit collaborators.
    pub fn with_parts(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        connector: Arc<dyn Connector>,
        fallback: Arc<dyn RoomFallback>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let connection = Arc::new(ConnectionManager::new(
            config,
            connector,
            store,
            clock.clone(),
        ));
        let relay = Arc::new(MessageRelay::new(connection.clone(), clock));
        let coordinator = RoomCoordinator::new(connection.clone(), relay.clone(), fallback);
        Self {
            connection,
            relay,
            coordinator,
        }
    }

    pub fn connect_socket(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.connection.connect(user_id)
    }

    pub fn disconnect_socket(&self) {
        self.connection.disconnect();
    }

    pub fn restore_socket_session(&self) -> Option<ConnectionHandle> {
        self.connection.restore_from_session()
    }

    pub fn is_socket_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub async fn create_chat_room(&self, user_id: &str, target_id: &str) -> CreateRoomOutcome {
        self.coordinator.create_or_get_room(user_id, target_id).await
    }

    pub fn join_room(&self, room_id: &str) -> bool {
        self.relay.join_room(room_id)
    }

    pub fn leave_room(&self, room_id: &str) -> bool {
        self.relay.leave_room(room_id)
    }

    pub fn send_message(&self, room_id: &str, content: &str, user_id: &str) -> bool {
        self.relay.send_message(room_id, content, user_id)
    }

    pub fn subscribe(&self, room_id: &str) -> mpsc::UnboundedReceiver<ChatMessage> {
        self.relay.subscribe(room_id)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.subscribe_status()
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }
}
