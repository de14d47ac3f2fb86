//! Transport seam between the connection manager and the network.
//!
//! A [`Connector`] opens one link per connect attempt. The link is a pair of
//! channels: outbound [`ClientFrame`]s and inbound [`LinkEvent`]s. Dropping the
//! outbound sender closes the link.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tsunagi_shared::protocol::{ClientFrame, KickReason, ServerFrame};

use crate::error::TransportError;

#[cfg(test)]
pub(crate) mod testing;
pub mod websocket;

pub use websocket::WebSocketConnector;

/// Parameters of a connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: String,
    pub user_id: String,
    pub auth_token: Option<String>,
}

/// Why an established link ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the link or the stream ended
    Closed,
    /// The server kicked this connection
    Kicked(KickReason),
    /// Transport failure
    Error(String),
}

impl DisconnectReason {
    /// Whether the server refused the credentials of this connection.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, DisconnectReason::Kicked(KickReason::Unauthorized))
    }
}

/// Inbound traffic of a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Frame(ServerFrame),
    /// Last event of a link
    Closed(DisconnectReason),
}

/// An established link
#[derive(Debug)]
pub struct TransportLink {
    /// Server-assigned connection id
    pub connection_id: String,
    pub outbound: mpsc::UnboundedSender<ClientFrame>,
    pub inbound: mpsc::UnboundedReceiver<LinkEvent>,
}

/// Opens links to the signaling server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a link.
    ///
    /// # Errors
    ///
    /// [`TransportError::Unauthorized`] when the server rejects the credentials,
    /// other variants for failures worth retrying.
    async fn open(&self, request: ConnectRequest) -> Result<TransportLink, TransportError>;
}
