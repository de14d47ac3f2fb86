//! Signaling server for pairwise chat rooms.
//!
//! Accepts WebSocket connections, creates rooms for participant pairs, relays
//! room messages between connections and exposes a stateless HTTP endpoint
//! for room creation.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod bootstrap;
