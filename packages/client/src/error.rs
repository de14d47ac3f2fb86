//! Error types of the signaling client.
//!
//! These stay on internal seams. The public connection, room and message
//! operations report failures as state or plain return values.

use thiserror::Error;

/// Failure to open or keep a transport link
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server rejected the credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Connection error
    #[error("Connection error: {0}")]
    Connect(String),

    /// The server sent something unexpected during the handshake
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server closed the link before it was established
    #[error("Connection closed by server")]
    Closed,
}

/// Durable key/value storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
}

/// HTTP room creation failures
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Server refused to create the room: {0}")]
    Rejected(String),
}

/// Request/acknowledgement failures on the live link
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Not connected")]
    NotConnected,

    #[error("Link closed before the acknowledgement arrived")]
    LinkClosed,
}

/// Errors that end the interactive client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Neither a user id nor a restorable session
    #[error("No user id given and no valid session to restore")]
    NoSession,

    /// Connection gave up
    #[error("Can't connect: {0}")]
    CannotConnect(String),
}
