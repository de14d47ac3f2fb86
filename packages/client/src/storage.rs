//! Durable key/value storage for client state.
//!
//! The client persists two values across restarts: the session record used
//! for automatic reconnection and the auth token written by whatever system
//! signs the user in. Both live behind [`KeyValueStore`] so tests and embedders
//! can swap the file-backed store for an in-memory one.

use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::{Arc, RwLock},
};

use crate::error::StorageError;

/// Key of the persisted session record.
pub const SESSION_KEY: &str = "chat_session";
/// Key of the opaque auth token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Minimal synchronous key/value storage.
///
/// Values are a few hundred bytes at most and are written from the connection
/// supervisor right before it publishes a status, so calls block the caller.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Stores each key as a file under a state directory.
pub struct FileStore {
    location: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(location: P) -> Self {
        Self {
            location: location.into(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.location.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.location)?;

        // rename keeps readers from seeing a half-written value
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// Access to the stored auth token.
///
/// The token is written by the sign-in flow outside this crate. The client only
/// reads it when connecting and clears it when the server rejects it.
#[derive(Clone)]
pub struct AuthTokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl AuthTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current token, if any. Read failures count as "no token".
    pub fn load(&self) -> Option<String> {
        match self.store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read auth token: {}", e);
                None
            }
        }
    }

    pub fn save(&self, token: &str) {
        if let Err(e) = self.store.set(AUTH_TOKEN_KEY, token) {
            tracing::warn!("Failed to store auth token: {}", e);
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(AUTH_TOKEN_KEY) {
            tracing::warn!("Failed to clear auth token: {}", e);
        }
    }
}
