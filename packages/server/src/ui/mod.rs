//! UI 層: axum のルーティングと WebSocket / HTTP ハンドラ

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
