//! ClientHub - fan-out to every connected WebSocket client
//!
//! Outgoing messages are serialized once and pushed through a tokio broadcast channel;
//! each connection task holds a receiver. Incoming events are routed to handlers
//! registered by name.

use std::collections::HashMap;
use std::sync::Arc;

use eyre::{Context, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use super::messages::Envelope;
use crate::relay::BroadcastSink;

/// Default per-client frame buffer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Handler for a named client event, called with the client id and the event data
pub type MessageHandler = Arc<dyn Fn(String, Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Central hub shared by the WebSocket server and everything that broadcasts
pub struct ClientHub {
    tx: broadcast::Sender<String>,
    handlers: RwLock<HashMap<String, MessageHandler>>,
}

impl ClientHub {
    /// Create a new hub with the given per-client capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "ClientHub::new: creating hub");
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new hub with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Send `payload` under `topic` to every connected client
    ///
    /// Fire-and-forget: with no clients connected the frame is simply dropped.
    pub fn send_message(&self, topic: &str, payload: Value) -> Result<()> {
        let frame = serde_json::to_string(&Envelope::new(topic, payload)).context("Failed to serialize frame")?;
        debug!(%topic, clients = self.client_count(), "ClientHub::send_message");
        // Ignore send errors (no clients is OK)
        let _ = self.tx.send(frame);
        Ok(())
    }

    /// Subscribe to outgoing frames
    ///
    /// Each connection subscribes once; frames sent before subscribing are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        debug!("ClientHub::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Register the handler for `event`, replacing any previous one
    pub async fn on_message(&self, event: impl Into<String>, handler: MessageHandler) {
        let event = event.into();
        debug!(%event, "ClientHub::on_message: registering handler");
        self.handlers.write().await.insert(event, handler);
    }

    /// Run the handler registered for `event`, if any
    ///
    /// Returns whether a handler was found.
    pub async fn dispatch(&self, event: &str, client_id: &str, data: Value) -> bool {
        let handler = self.handlers.read().await.get(event).cloned();
        match handler {
            Some(handler) => {
                debug!(%event, %client_id, "ClientHub::dispatch: running handler");
                handler(client_id.to_string(), data).await;
                true
            }
            None => {
                debug!(%event, %client_id, "ClientHub::dispatch: no handler");
                false
            }
        }
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl BroadcastSink for ClientHub {
    fn send_message(&self, topic: &str, payload: Value) -> Result<()> {
        ClientHub::send_message(self, topic, payload)
    }
}
