//! Chat room signaling client.
//!
//! Keeps one connection to the signaling server alive with bounded
//! reconnection, creates rooms for participant pairs with an HTTP fallback,
//! relays room messages and restores the session after restarts.

pub mod chat_client;
pub mod cli;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod fallback;
pub mod relay;
pub mod session;
pub mod storage;
pub mod transport;

pub use chat_client::ChatClient;
pub use config::ClientConfig;
pub use connection::{
    ConnectionHandle, ConnectionManager, ConnectionState, ConnectionStatus, Termination,
};
pub use coordinator::{CreateRoomOutcome, RoomCoordinator};
pub use relay::{ChatMessage, MessageRelay};
