//! Connection supervisor task: connect, serve, reconnect, give up.

use std::sync::Arc;

use tokio::time::{sleep, timeout};
use tsunagi_shared::protocol::{ClientFrame, ServerFrame};

use super::{
    Ack, ConnectionStatus, LiveLink, Shared, Termination, lock,
    backoff::{reconnect_delay, should_attempt_reconnect},
};
use crate::{
    error::TransportError,
    relay::ChatMessage,
    transport::{ConnectRequest, DisconnectReason, LinkEvent, TransportLink},
};

/// How a single connect attempt ended
enum Outcome {
    /// The link could not be opened
    Failed,
    /// The link was established and later dropped
    Dropped,
    /// The server refused the credentials
    Rejected,
}

pub(super) struct Supervisor {
    shared: Arc<Shared>,
    user_id: String,
    epoch: u64,
}

impl Supervisor {
    pub(super) fn new(shared: Arc<Shared>, user_id: String, epoch: u64) -> Self {
        Self {
            shared,
            user_id,
            epoch,
        }
    }

    pub(super) async fn run(self) {
        let max_attempts = self.shared.config.max_reconnect_attempts;
        let mut attempt: u32 = 0;

        loop {
            if !self.shared.is_current(self.epoch) {
                return;
            }
            tracing::info!(
                "Connecting to {} as '{}' (attempt {}/{})",
                self.shared.config.ws_url,
                self.user_id,
                attempt + 1,
                max_attempts + 1
            );

            match self.attempt(attempt).await {
                Outcome::Rejected => {
                    tracing::error!("Server rejected the credentials of '{}'", self.user_id);
                    self.give_up(Termination::AuthRejected);
                    return;
                }
                // a successful connect resets the counter
                Outcome::Dropped => attempt = 0,
                Outcome::Failed => {}
            }

            attempt += 1;
            if !should_attempt_reconnect(attempt, max_attempts) {
                tracing::error!(
                    "Failed to reconnect after {} attempts. Giving up.",
                    max_attempts
                );
                self.give_up(Termination::RetriesExhausted);
                return;
            }

            let delay = reconnect_delay(self.shared.config.base_delay, attempt);
            tracing::info!(
                "Reconnecting in {:?}... (attempt {}/{})",
                delay,
                attempt,
                max_attempts
            );
            self.shared.publish(self.epoch, ConnectionStatus::connecting(attempt));
            sleep(delay).await;
        }
    }

    async fn attempt(&self, attempt: u32) -> Outcome {
        self.shared.publish(self.epoch, ConnectionStatus::connecting(attempt));

        let request = ConnectRequest {
            url: self.shared.config.ws_url.clone(),
            user_id: self.user_id.clone(),
            auth_token: self.shared.tokens.load(),
        };
        let connect_timeout = self.shared.config.connect_timeout;
        let link = match timeout(connect_timeout, self.shared.connector.open(request)).await {
            Ok(Ok(link)) => link,
            Ok(Err(TransportError::Unauthorized)) => return Outcome::Rejected,
            Ok(Err(e)) => {
                tracing::warn!("Connection attempt failed: {}", e);
                return Outcome::Failed;
            }
            Err(_) => {
                tracing::warn!("Connection attempt timed out after {:?}", connect_timeout);
                return Outcome::Failed;
            }
        };

        let reason = self.serve(link).await;
        if reason.is_auth_rejection() {
            Outcome::Rejected
        } else {
            tracing::warn!("Connection lost: {:?}", reason);
            Outcome::Dropped
        }
    }

    /// Run an established link until it ends.
    async fn serve(&self, link: TransportLink) -> DisconnectReason {
        let TransportLink {
            connection_id,
            outbound,
            mut inbound,
        } = link;

        {
            let mut slot = lock(&self.shared.link);
            if !self.shared.is_current(self.epoch) {
                return DisconnectReason::Closed;
            }
            *slot = Some(LiveLink {
                connection_id: connection_id.clone(),
                outbound,
                pending: Default::default(),
            });
        }

        tracing::info!("Connected as '{}' ({})", self.user_id, connection_id);
        // inline, so status observers find the session already written
        self.shared.sessions.save(&self.user_id);
        self.shared.publish(self.epoch, ConnectionStatus::connected(connection_id));
        self.rejoin_rooms();

        let reason = loop {
            match inbound.recv().await {
                Some(LinkEvent::Frame(frame)) => {
                    if let Some(reason) = self.dispatch(frame) {
                        break reason;
                    }
                }
                Some(LinkEvent::Closed(reason)) => break reason,
                None => break DisconnectReason::Closed,
            }
        };

        let mut slot = lock(&self.shared.link);
        if self.shared.is_current(self.epoch) {
            *slot = None;
        }
        reason
    }

    /// Subscribe the new link to every room joined before the drop.
    fn rejoin_rooms(&self) {
        let rooms = self.shared.rooms.joined();
        if rooms.is_empty() {
            return;
        }
        tracing::info!("Rejoining {} rooms", rooms.len());
        for room_id in rooms {
            if !self.shared.send(ClientFrame::JoinRoom { room_id }) {
                tracing::warn!("Link closed while rejoining rooms");
                return;
            }
        }
    }

    /// Handle one inbound frame. Returns a reason when the link must end.
    fn dispatch(&self, frame: ServerFrame) -> Option<DisconnectReason> {
        match frame {
            ServerFrame::Ack {
                request_id,
                success,
                room_id,
                error,
            } => {
                let waiter = lock(&self.shared.link)
                    .as_mut()
                    .and_then(|link| link.pending.remove(&request_id));
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(Ack {
                            success,
                            room_id,
                            error,
                        });
                    }
                    None => tracing::debug!("Ignoring ack for abandoned request {}", request_id),
                }
                None
            }
            ServerFrame::Message {
                room_id,
                user_id,
                content,
                timestamp,
            } => {
                let delivered = self.shared.rooms.deliver(ChatMessage {
                    room_id,
                    user_id,
                    content,
                    timestamp,
                });
                tracing::debug!("Delivered message to {} subscribers", delivered);
                None
            }
            ServerFrame::Kicked { reason } => Some(DisconnectReason::Kicked(reason)),
            ServerFrame::Welcome { connection_id } => {
                tracing::debug!("Ignoring repeated welcome ({})", connection_id);
                None
            }
        }
    }

    /// Stop for good, clearing what the termination invalidates.
    fn give_up(&self, termination: Termination) {
        if !self.shared.is_current(self.epoch) {
            return;
        }
        if termination == Termination::AuthRejected {
            self.shared.tokens.clear();
        }
        self.shared.sessions.clear();
        self.shared.publish(self.epoch, ConnectionStatus::idle(termination));
    }
}
