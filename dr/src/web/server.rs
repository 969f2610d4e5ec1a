//! WebSocket server
//!
//! Accepts browser connections, forwards every hub broadcast to each client, and routes
//! named client events to the hub's handlers.
//!
//! The server raises `client_connected` itself once the handshake completes, with an empty
//! object as data. Inbound events are handled one at a time on the connection's own task.

use std::net::SocketAddr;
use std::sync::Arc;

use eyre::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::hub::ClientHub;
use super::messages::{CLIENT_CONNECTED, Envelope};

/// WebSocket listener bound to an address
pub struct WebServer {
    listener: TcpListener,
    hub: Arc<ClientHub>,
}

impl WebServer {
    /// Bind the listener
    pub async fn bind(addr: &str, hub: Arc<ClientHub>) -> Result<Self> {
        debug!(%addr, "WebServer::bind: called");
        let listener = TcpListener::bind(addr)
            .await
            .context(format!("Failed to bind WebSocket listener on {}", addr))?;
        Ok(Self { listener, hub })
    }

    /// The address actually bound, useful when binding port 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per client
    pub async fn run(self) -> Result<()> {
        info!("WebSocket server listening on {}", self.local_addr()?);

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            debug!(%peer, "WebServer::run: accepted connection");
            let hub = self.hub.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, hub).await {
                    debug!(%peer, error = %e, "WebServer::run: connection ended with error");
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, hub: Arc<ClientHub>) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let client_id = Uuid::now_v7().to_string();
    info!(%peer, %client_id, "WebSocket client connected");

    // Subscribe before greeting so the greeting broadcast reaches this client too
    let mut frames = hub.subscribe();
    let (mut sink, mut inbound) = ws.split();

    spawn_dispatch(hub.clone(), CLIENT_CONNECTED.to_string(), client_id.clone(), json!({}));

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if let Err(e) = sink.send(Message::text(frame)).await {
                        debug!(%client_id, error = %e, "handle_connection: send failed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%client_id, skipped, "Client is too slow, skipped frames");
                }
                Err(RecvError::Closed) => break,
            },
            message = inbound.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    handle_inbound(&hub, &client_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%client_id, error = %e, "handle_connection: read failed");
                    break;
                }
            },
        }
    }

    info!(%client_id, "WebSocket client disconnected");
    Ok(())
}

async fn handle_inbound(hub: &ClientHub, client_id: &str, text: &str) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(%client_id, error = %e, "handle_inbound: ignoring malformed frame");
            return;
        }
    };

    // The server greets on handshake; a client announcing itself would be greeted twice
    if envelope.event == CLIENT_CONNECTED {
        debug!(%client_id, "handle_inbound: ignoring client-sent client_connected");
        return;
    }

    hub.dispatch(&envelope.event, client_id, envelope.data).await;
}

fn spawn_dispatch(hub: Arc<ClientHub>, event: String, client_id: String, data: Value) {
    tokio::spawn(async move {
        hub.dispatch(&event, &client_id, data).await;
    });
}
