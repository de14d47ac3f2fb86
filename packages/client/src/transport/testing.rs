//! Scripted connector for unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tsunagi_shared::protocol::ClientFrame;

use super::{ConnectRequest, Connector, LinkEvent, TransportLink};
use crate::error::TransportError;

/// Outcome of one `open` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Script {
    Accept,
    Fail,
    Unauthorized,
    /// Never completes
    Hang,
}

/// Server side of an accepted link
pub(crate) struct RemoteEnd {
    pub request: ConnectRequest,
    pub frames: mpsc::UnboundedReceiver<ClientFrame>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

pub(crate) struct ScriptedConnector {
    script: Mutex<VecDeque<Script>>,
    otherwise: Script,
    opens: AtomicUsize,
    accepted: mpsc::UnboundedSender<RemoteEnd>,
}

impl ScriptedConnector {
    /// Plays `script` in order, then answers every further attempt with `otherwise`.
    pub fn new(
        script: Vec<Script>,
        otherwise: Script,
    ) -> (Self, mpsc::UnboundedReceiver<RemoteEnd>) {
        let (accepted, remote_ends) = mpsc::unbounded_channel();
        let connector = Self {
            script: Mutex::new(script.into()),
            otherwise,
            opens: AtomicUsize::new(0),
            accepted,
        };
        (connector, remote_ends)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, request: ConnectRequest) -> Result<TransportLink, TransportError> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.otherwise);
        match step {
            Script::Accept => {
                let (outbound, frames) = mpsc::unbounded_channel();
                let (events, inbound) = mpsc::unbounded_channel();
                let _ = self.accepted.send(RemoteEnd {
                    request,
                    frames,
                    events,
                });
                Ok(TransportLink {
                    connection_id: format!("conn-{attempt}"),
                    outbound,
                    inbound,
                })
            }
            Script::Fail => Err(TransportError::Connect("connection refused".to_string())),
            Script::Unauthorized => Err(TransportError::Unauthorized),
            Script::Hang => std::future::pending().await,
        }
    }
}
