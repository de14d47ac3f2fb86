//! Persisted session record used for automatic reconnection.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tsunagi_shared::time::Clock;

use crate::storage::{KeyValueStore, SESSION_KEY};

/// Who was connected and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    /// Unix timestamp (milliseconds) of the last successful connect
    pub timestamp: i64,
}

/// Reads and writes the [`SessionRecord`] under the `chat_session` key.
///
/// Storage failures are logged and otherwise ignored. A record that is
/// missing, unreadable or malformed is reported as absent.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Record a successful connect for `user_id` at the current time.
    pub fn save(&self, user_id: &str) {
        let record = SessionRecord {
            user_id: user_id.to_string(),
            timestamp: self.clock.now_millis(),
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize session record: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(SESSION_KEY, &json) {
            tracing::warn!("Failed to save session for '{}': {}", user_id, e);
        }
    }

    pub fn load(&self) -> Option<SessionRecord> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read session: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Ignoring malformed session record: {}", e);
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            tracing::warn!("Failed to clear session: {}", e);
        }
    }

    /// A record is valid while it is younger than the configured TTL.
    pub fn is_valid(&self, record: &SessionRecord) -> bool {
        let ttl = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        self.clock.now_millis().saturating_sub(record.timestamp) < ttl
    }
}
