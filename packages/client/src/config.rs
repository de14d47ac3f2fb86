//! Client configuration.

use std::time::Duration;

/// Default WebSocket endpoint of the signaling server.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8080/ws";
/// Default base URL of the signaling server's HTTP API.
pub const DEFAULT_HTTP_URL: &str = "http://127.0.0.1:8080";

/// Tunables of the connection manager and room coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint, without query parameters
    pub ws_url: String,
    /// Base URL for the HTTP fallback (`POST {http_url}/api/chats/create`)
    pub http_url: String,
    /// Reconnect delay unit; attempt `n` waits `base_delay * min(n, 3)`
    pub base_delay: Duration,
    /// Failed attempts tolerated before giving up
    pub max_reconnect_attempts: u32,
    /// Upper bound of a single connect attempt
    pub connect_timeout: Duration,
    /// Time allowed for the WebSocket room creation path before falling back to HTTP
    pub room_timeout: Duration,
    /// How long a persisted session stays usable for automatic reconnection
    pub session_ttl: Duration,
    /// Refuse to connect when no auth token is stored
    pub require_auth_token: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            http_url: DEFAULT_HTTP_URL.to_string(),
            base_delay: Duration::from_millis(3000),
            max_reconnect_attempts: 5,
            connect_timeout: Duration::from_secs(10),
            room_timeout: Duration::from_millis(3000),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            require_auth_token: false,
        }
    }
}

impl ClientConfig {
    /// Build a config pointing at a server reachable under `host:port`.
    pub fn for_server(host: &str, port: u16) -> Self {
        Self {
            ws_url: format!("ws://{host}:{port}/ws"),
            http_url: format!("http://{host}:{port}"),
            ..Self::default()
        }
    }
}
