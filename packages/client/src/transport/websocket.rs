//! WebSocket connector built on tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self,
        client::IntoClientRequest,
        http::{HeaderValue, StatusCode, header::AUTHORIZATION},
        protocol::Message,
    },
};
use tsunagi_shared::protocol::{ClientFrame, KickReason, ServerFrame};

use super::{ConnectRequest, Connector, DisconnectReason, LinkEvent, TransportLink};
use crate::error::TransportError;

/// Connects to `GET /ws?user_id=<id>` with an optional bearer token.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

fn connect_url(request: &ConnectRequest) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(&request.url).map_err(|e| TransportError::Connect(e.to_string()))?;
    url.query_pairs_mut().append_pair("user_id", &request.user_id);
    Ok(url)
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, request: ConnectRequest) -> Result<TransportLink, TransportError> {
        let url = connect_url(&request)?;
        let mut ws_request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        if let Some(token) = &request.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            ws_request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws_stream, _response) = match connect_async(ws_request).await {
            Ok(result) => result,
            Err(tungstenite::Error::Http(response))
                if response.status() == StatusCode::UNAUTHORIZED =>
            {
                return Err(TransportError::Unauthorized);
            }
            Err(e) => return Err(TransportError::Connect(e.to_string())),
        };

        let (mut write, mut read) = ws_stream.split();

        // The server greets every connection with its id before anything else
        let connection_id = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(ServerFrame::Welcome { connection_id }) => break connection_id,
                    Ok(ServerFrame::Kicked {
                        reason: KickReason::Unauthorized,
                    }) => return Err(TransportError::Unauthorized),
                    Ok(frame) => {
                        return Err(TransportError::Protocol(format!(
                            "expected welcome, got {frame:?}"
                        )));
                    }
                    Err(e) => return Err(TransportError::Protocol(e.to_string())),
                },
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Connect(e.to_string())),
            }
        };
        tracing::debug!("WebSocket link established as '{}'", connection_id);

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        // Writer: ends when the owner drops the outbound sender
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send frame: {}", e);
                    return;
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        // Reader: forwards frames until the link ends, then reports why
        tokio::spawn(async move {
            let reason = loop {
                let message = match read.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => break DisconnectReason::Error(e.to_string()),
                    None => break DisconnectReason::Closed,
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(ServerFrame::Kicked { reason }) => {
                            break DisconnectReason::Kicked(reason);
                        }
                        Ok(frame) => {
                            tracing::debug!("Received frame: {:?}", frame);
                            if inbound_tx.send(LinkEvent::Frame(frame)).is_err() {
                                return;
                            }
                        }
                        Err(e) => tracing::warn!("Failed to parse frame as JSON: {}", e),
                    },
                    Message::Close(_) => break DisconnectReason::Closed,
                    _ => {}
                }
            };
            let _ = inbound_tx.send(LinkEvent::Closed(reason));
        });

        Ok(TransportLink {
            connection_id,
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
