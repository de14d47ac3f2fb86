//! Code shared by the Tsunagi signaling client and server.
//!
//! - `logger`: tracing subscriber setup for the binaries
//! - `time`: clock abstraction for testability
//! - `room`: canonical room identity for two-party chats
//! - `protocol`: WebSocket frames and HTTP bodies exchanged between client and server

pub mod logger;
pub mod protocol;
pub mod room;
pub mod time;
