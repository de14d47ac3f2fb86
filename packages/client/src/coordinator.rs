//! Room Coordinator
//!
//! Creates (or looks up) the room of two participants. The WebSocket path is
//! tried first and gets a fixed time budget that covers both waiting for the
//! connection and waiting for the acknowledgement. When that budget runs out
//! or the server refuses, the room is created over HTTP instead. When HTTP
//! fails too, the locally derived room id is used and the outcome is marked
//! as unconfirmed.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use serde::Serialize;
use tokio::time::timeout;
use tsunagi_shared::{protocol::ClientFrame, room::resolve_room_id};

use crate::{
    connection::{ConnectionManager, lock},
    error::RequestError,
    fallback::RoomFallback,
    relay::MessageRelay,
};

/// Result of [`RoomCoordinator::create_or_get_room`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomOutcome {
    /// Always `true`; failures degrade to an unconfirmed room instead
    pub success: bool,
    pub room_id: String,
    pub target_id: String,
    /// How the room was obtained when the WebSocket path was not used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// `false` when no server confirmed the room
    pub confirmed: bool,
}

type SharedOutcome = Shared<BoxFuture<'static, CreateRoomOutcome>>;

struct Negotiator {
    connection: Arc<ConnectionManager>,
    relay: Arc<MessageRelay>,
    fallback: Arc<dyn RoomFallback>,
    room_timeout: Duration,
}

impl Negotiator {
    async fn negotiate(
        &self,
        user_id: String,
        target_id: String,
        room_id: String,
    ) -> CreateRoomOutcome {
        let Some(handle) = self.connection.connect(&user_id) else {
            return self
                .fall_back(&user_id, target_id, room_id, "no connection")
                .await;
        };

        let primary = async {
            if !handle.wait_connected().await {
                return Err(RequestError::NotConnected);
            }
            let request = self.connection.request(|request_id| ClientFrame::CreateRoom {
                request_id,
                user_id: user_id.clone(),
                target_id: target_id.clone(),
            });
            match request {
                Ok(waiter) => waiter.wait().await,
                Err(e) => Err(e),
            }
        };

        let result = timeout(self.room_timeout, primary).await;
        let reason = match result {
            Ok(Ok(ack)) if ack.success => {
                let room_id = ack.room_id.unwrap_or(room_id);
                self.relay.join_room(&room_id);
                tracing::info!("Room '{}' ready", room_id);
                return CreateRoomOutcome {
                    success: true,
                    room_id,
                    target_id,
                    note: None,
                    confirmed: true,
                };
            }
            Ok(Ok(ack)) => format!(
                "server refused: {}",
                ack.error.as_deref().unwrap_or("no reason given")
            ),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no acknowledgement within {:?}", self.room_timeout),
        };
        tracing::warn!(
            "Creating room '{}' over WebSocket failed ({}), falling back to HTTP",
            room_id,
            reason
        );
        self.fall_back(&user_id, target_id, room_id, &reason).await
    }

    async fn fall_back(
        &self,
        user_id: &str,
        target_id: String,
        room_id: String,
        reason: &str,
    ) -> CreateRoomOutcome {
        let token = self.connection.tokens().load();
        match self.fallback.create_chat(user_id, &target_id, token).await {
            Ok(response) => {
                let room_id = response.room_id.unwrap_or(room_id);
                // only joins when a connection came up in the meantime
                self.relay.join_room(&room_id);
                tracing::info!("Room '{}' created over HTTP", room_id);
                CreateRoomOutcome {
                    success: true,
                    room_id,
                    target_id,
                    note: Some(format!("created over HTTP ({reason})")),
                    confirmed: true,
                }
            }
            Err(e) => {
                tracing::error!("Creating room '{}' over HTTP failed: {}", room_id, e);
                CreateRoomOutcome {
                    success: true,
                    room_id,
                    target_id,
                    note: Some(format!("room not confirmed by the server ({e})")),
                    confirmed: false,
                }
            }
        }
    }
}

type InFlight = Arc<Mutex<HashMap<String, SharedOutcome>>>;

/// Coordinates room creation. Overlapping calls for the same pair share one round.
///
/// Each round runs in its own task, so a caller that stops waiting neither
/// stalls the round nor leaves it behind for later callers.
pub struct RoomCoordinator {
    negotiator: Arc<Negotiator>,
    in_flight: InFlight,
}

impl RoomCoordinator {
    pub fn new(
        connection: Arc<ConnectionManager>,
        relay: Arc<MessageRelay>,
        fallback: Arc<dyn RoomFallback>,
    ) -> Self {
        let room_timeout = connection.config().room_timeout;
        Self {
            negotiator: Arc::new(Negotiator {
                connection,
                relay,
                fallback,
                room_timeout,
            }),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create or look up the room of `user_id` and `target_id`, then join it.
    ///
    /// Never fails: see [`CreateRoomOutcome::confirmed`].
    pub async fn create_or_get_room(&self, user_id: &str, target_id: &str) -> CreateRoomOutcome {
        let room_id = resolve_room_id(user_id, target_id);

        let outcome = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&room_id) {
                Some(outcome) => {
                    tracing::debug!("Waiting for in-flight creation of '{}'", room_id);
                    outcome.clone()
                }
                None => {
                    let outcome = self.start_round(user_id, target_id, room_id.clone());
                    in_flight.insert(room_id, outcome.clone());
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Spawn a negotiation round. The round removes its own `in_flight` entry
    /// when it ends; the caller inserts it while still holding the lock.
    fn start_round(&self, user_id: &str, target_id: &str, room_id: String) -> SharedOutcome {
        let negotiator = self.negotiator.clone();
        let in_flight = self.in_flight.clone();
        let (user_id, target_id) = (user_id.to_string(), target_id.to_string());
        let key = room_id.clone();
        let fallback_target = target_id.clone();
        let round_in_flight = in_flight.clone();

        let round = tokio::spawn(async move {
            let outcome = negotiator.negotiate(user_id, target_id, key.clone()).await;
            lock(&round_in_flight).remove(&key);
            outcome
        });

        async move {
            match round.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Creating room '{}' did not finish: {}", room_id, e);
                    lock(&in_flight).remove(&room_id);
                    CreateRoomOutcome {
                        success: true,
                        room_id,
                        target_id: fallback_target,
                        note: Some(format!("room creation interrupted ({e})")),
                        confirmed: false,
                    }
                }
            }
        }
        .boxed()
        .shared()
    }
}
