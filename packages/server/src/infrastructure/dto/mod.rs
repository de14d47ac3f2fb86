//! Data Transfer Objects (DTOs) for the signaling server.
//!
//! WebSocket frames and the room-creation HTTP bodies are shared with the
//! client and live in `tsunagi_shared::protocol`; this module holds the
//! server-only HTTP response DTOs.

pub mod http;
