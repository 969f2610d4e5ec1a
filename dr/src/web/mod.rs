//! Browser-facing side: client hub and WebSocket server

mod hub;
mod messages;
mod server;

pub use hub::{ClientHub, DEFAULT_CHANNEL_CAPACITY, MessageHandler};
pub use messages::{CLIENT_CONNECTED, Envelope};
pub use server::WebServer;
