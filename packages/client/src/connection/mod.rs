//! Connection Manager
//!
//! Owns the single logical connection of a client session. A supervisor task
//! per connection opens links through a [`Connector`], reconnects with linear
//! backoff after drops, persists the session on every successful connect and
//! gives up after too many failures or when the server refuses the credentials.
//!
//! Only the supervisor mutates connection state. Everyone else observes it
//! through [`ConnectionManager::subscribe_status`] or a [`ConnectionHandle`].

mod backoff;
mod supervisor;

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tsunagi_shared::{protocol::ClientFrame, time::Clock};

pub use backoff::{reconnect_delay, should_attempt_reconnect};

use self::supervisor::Supervisor;
use crate::{
    config::ClientConfig,
    error::RequestError,
    relay::RoomBook,
    session::SessionStore,
    storage::{AuthTokenStore, KeyValueStore},
    transport::Connector,
};

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
}

/// Why a connection went idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `disconnect()` was called
    UserRequested,
    /// Reconnection gave up after the maximum number of attempts
    RetriesExhausted,
    /// The server refused the credentials
    AuthRejected,
}

/// Snapshot of the connection published to observers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Consecutive failed attempts, reset on every successful connect
    pub reconnect_attempt: u32,
    /// Set when the connection is idle after having been started
    pub termination: Option<Termination>,
    /// Server-assigned id of the live link
    pub connection_id: Option<String>,
}

impl ConnectionStatus {
    fn connecting(reconnect_attempt: u32) -> Self {
        Self {
            state: ConnectionState::Connecting,
            reconnect_attempt,
            ..Self::default()
        }
    }

    fn connected(connection_id: String) -> Self {
        Self {
            state: ConnectionState::Connected,
            connection_id: Some(connection_id),
            ..Self::default()
        }
    }

    fn idle(termination: Termination) -> Self {
        Self {
            termination: Some(termination),
            ..Self::default()
        }
    }

    /// The connection stopped for good and the user should be told.
    pub fn is_final_failure(&self) -> bool {
        matches!(
            self.termination,
            Some(Termination::RetriesExhausted | Termination::AuthRejected)
        )
    }
}

/// Acknowledgement of a request sent over the live link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
    pub room_id: Option<String>,
    pub error: Option<String>,
}

struct LiveLink {
    connection_id: String,
    outbound: mpsc::UnboundedSender<ClientFrame>,
    pending: HashMap<u64, oneshot::Sender<Ack>>,
}

/// State shared by the manager, its supervisor and outstanding waiters.
struct Shared {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    sessions: SessionStore,
    tokens: AuthTokenStore,
    rooms: Arc<RoomBook>,
    status: watch::Sender<ConnectionStatus>,
    /// Bumped whenever a connection is started or torn down. A supervisor
    /// only touches shared state while its epoch is current.
    epoch: AtomicU64,
    link: Mutex<Option<LiveLink>>,
    next_request_id: AtomicU64,
}

impl Shared {
    /// Start a new epoch and publish its first status atomically.
    fn begin(&self, status: ConnectionStatus) -> u64 {
        let mut epoch = 0;
        self.status.send_modify(|current| {
            epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            *current = status;
        });
        epoch
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Publish `status` unless `epoch` was superseded.
    fn publish(&self, epoch: u64, status: ConnectionStatus) -> bool {
        self.status.send_if_modified(|current| {
            if !self.is_current(epoch) {
                return false;
            }
            *current = status;
            true
        })
    }

    /// Drop the live link. Pending requests fail with [`RequestError::LinkClosed`].
    fn close_link(&self) {
        if let Some(link) = lock(&self.link).take() {
            tracing::debug!(
                "Closing link '{}' ({} requests pending)",
                link.connection_id,
                link.pending.len()
            );
        }
    }

    fn send(&self, frame: ClientFrame) -> bool {
        match lock(&self.link).as_ref() {
            Some(link) => link.outbound.send(frame).is_ok(),
            None => false,
        }
    }
}

/// Observer of a started connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    user_id: String,
    status: watch::Receiver<ConnectionStatus>,
}

impl ConnectionHandle {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Wait until the connection is established or has stopped.
    ///
    /// Returns `true` once connected. Keeps waiting through reconnect attempts,
    /// so callers that need a deadline wrap this in a timeout.
    pub async fn wait_connected(&self) -> bool {
        let mut status = self.status.clone();
        match status
            .wait_for(|s| s.state != ConnectionState::Connecting)
            .await
        {
            Ok(current) => current.state == ConnectionState::Connected,
            Err(_) => false,
        }
    }
}

/// Pending acknowledgement of a request.
///
/// Dropping the waiter abandons the request; an acknowledgement that arrives
/// afterwards is ignored.
pub struct AckWaiter {
    request_id: u64,
    rx: oneshot::Receiver<Ack>,
    shared: Arc<Shared>,
}

impl AckWaiter {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Wait for the acknowledgement.
    ///
    /// # Errors
    ///
    /// [`RequestError::LinkClosed`] if the link dropped first.
    pub async fn wait(mut self) -> Result<Ack, RequestError> {
        (&mut self.rx).await.map_err(|_| RequestError::LinkClosed)
    }
}

impl Drop for AckWaiter {
    fn drop(&mut self) {
        if let Some(link) = lock(&self.shared.link).as_mut() {
            link.pending.remove(&self.request_id);
        }
    }
}

struct ActiveConnection {
    user_id: String,
    task: JoinHandle<()>,
}

/// Manages one logical connection to the signaling server.
///
/// # Example
///
/// ```ignore
/// let manager = ConnectionManager::new(config, Arc::new(WebSocketConnector::new()), store, Arc::new(SystemClock));
/// if let Some(handle) = manager.connect("alice") {
///     handle.wait_connected().await;
/// }
/// ```
pub struct ConnectionManager {
    shared: Arc<Shared>,
    active: Mutex<Option<ActiveConnection>>,
}

impl ConnectionManager {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = SessionStore::new(store.clone(), clock, config.session_ttl);
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                sessions,
                tokens: AuthTokenStore::new(store),
                rooms: Arc::new(RoomBook::default()),
                status,
                epoch: AtomicU64::new(0),
                link: Mutex::new(None),
                next_request_id: AtomicU64::new(1),
            }),
            active: Mutex::new(None),
        }
    }

    fn handle(&self, user_id: &str) -> ConnectionHandle {
        ConnectionHandle {
            user_id: user_id.to_string(),
            status: self.shared.status.subscribe(),
        }
    }

    /// Start (or return) the connection for `user_id`.
    ///
    /// Returns the existing handle while the same user is connecting or
    /// connected, replaces a connection held by a different user, and returns
    /// `None` without starting anything when `user_id` is empty, no tokio
    /// runtime is running or a required auth token is missing.
    pub fn connect(&self, user_id: &str) -> Option<ConnectionHandle> {
        if user_id.is_empty() {
            tracing::warn!("Refusing to connect without a user id");
            return None;
        }

        let mut active = lock(&self.active);
        if let Some(current) = active.as_ref() {
            let state = self.shared.status.borrow().state;
            if current.user_id == user_id && state != ConnectionState::Idle {
                return Some(self.handle(user_id));
            }
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No async runtime available, cannot connect '{}'", user_id);
            return None;
        };
        if self.shared.config.require_auth_token && self.shared.tokens.load().is_none() {
            tracing::warn!("No auth token stored, not connecting '{}'", user_id);
            return None;
        }

        if let Some(previous) = active.take() {
            if previous.user_id != user_id {
                tracing::info!(
                    "Replacing connection of '{}' with '{}'",
                    previous.user_id,
                    user_id
                );
                self.shared.rooms.clear_joined();
            }
            previous.task.abort();
            self.shared.close_link();
        }

        let epoch = self.shared.begin(ConnectionStatus::connecting(0));
        let supervisor = Supervisor::new(self.shared.clone(), user_id.to_string(), epoch);
        let task = runtime.spawn(supervisor.run());
        *active = Some(ActiveConnection {
            user_id: user_id.to_string(),
            task,
        });
        Some(self.handle(user_id))
    }

    /// Tear the connection down on request.
    ///
    /// Cancels pending reconnects, closes the link, discards the persisted
    /// session and forgets joined rooms.
    pub fn disconnect(&self) {
        let previous = lock(&self.active).take();
        self.shared.begin(ConnectionStatus::idle(Termination::UserRequested));
        if let Some(previous) = previous {
            tracing::info!("Disconnecting '{}'", previous.user_id);
            previous.task.abort();
        }
        self.shared.close_link();
        self.shared.sessions.clear();
        self.shared.rooms.clear_joined();
    }

    /// Reconnect the user of a persisted, still valid session.
    ///
    /// An expired or unreadable session is discarded.
    pub fn restore_from_session(&self) -> Option<ConnectionHandle> {
        match self.shared.sessions.load() {
            Some(record) if self.shared.sessions.is_valid(&record) => {
                tracing::info!("Restoring session of '{}'", record.user_id);
                self.connect(&record.user_id)
            }
            Some(record) => {
                tracing::info!("Session of '{}' expired, discarding", record.user_id);
                self.shared.sessions.clear();
                None
            }
            None => {
                self.shared.sessions.clear();
                None
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.status.borrow().state == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.shared.status.borrow().state == ConnectionState::Connecting
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// User of the current (or last started) connection.
    pub fn user_id(&self) -> Option<String> {
        lock(&self.active).as_ref().map(|a| a.user_id.clone())
    }

    /// Send a frame that expects an acknowledgement.
    ///
    /// `build` receives the request id to embed in the frame.
    ///
    /// # Errors
    ///
    /// [`RequestError::NotConnected`] without a live link.
    pub fn request<F>(&self, build: F) -> Result<AckWaiter, RequestError>
    where
        F: FnOnce(u64) -> ClientFrame,
    {
        let request_id = self.shared.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut link = lock(&self.shared.link);
            let live = link.as_mut().ok_or(RequestError::NotConnected)?;
            live.pending.insert(request_id, tx);
            if live.outbound.send(build(request_id)).is_err() {
                live.pending.remove(&request_id);
                return Err(RequestError::LinkClosed);
            }
        }
        Ok(AckWaiter {
            request_id,
            rx,
            shared: self.shared.clone(),
        })
    }

    /// Send a fire-and-forget frame. `false` without a live link.
    pub fn send(&self, frame: ClientFrame) -> bool {
        self.shared.send(frame)
    }

    pub(crate) fn rooms(&self) -> &Arc<RoomBook> {
        &self.shared.rooms
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.shared.sessions
    }

    pub fn tokens(&self) -> &AuthTokenStore {
        &self.shared.tokens
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Lose the link without the supervisor noticing.
    #[cfg(test)]
    pub(crate) fn drop_link_for_test(&self) {
        self.shared.close_link();
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.active).take() {
            active.task.abort();
        }
    }
}

#[cfg(test)]
mod tests;
