//! distrelay - ultrasonic distance sensor to browser relay
//!
//! Polls an ultrasonic range sensor through a hardware bridge and pushes every reading to
//! connected browsers over WebSocket as a `distance_update` message.
//!
//! # Core Concepts
//!
//! - **Uniform messages**: a failed read is broadcast as sentinel values with `valid: false`
//! - **Quiet absence**: timeouts and empty replies are routine; only malfunctions are logged
//! - **Rate limited**: the loop checks every tick and emits only once the update interval passed
//! - **Greeting**: every new client triggers one immediate broadcast
//!
//! # Modules
//!
//! - [`bridge`] - Bridge trait, Unix socket client and simulator
//! - [`sensor`] - Two-query sensor read with a typed outcome
//! - [`update`] - The `distance_update` wire message
//! - [`relay`] - Emit cycle, broadcast loop and connection greeter
//! - [`web`] - Client hub and WebSocket server
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod bridge;
pub mod cli;
pub mod config;
pub mod relay;
pub mod sensor;
pub mod update;
pub mod web;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeError, SimulatedBridge, SocketBridge, create_bridge};
pub use config::{BridgeConfig, Config, RelayConfig, WebConfig};
pub use relay::{BroadcastLoop, BroadcastSink, ConnectionGreeter, Emission, UpdateEmitter};
pub use sensor::{ReadOutcome, SensorReader, SensorReading};
pub use update::{DISTANCE_UPDATE_TOPIC, DistanceUpdate, format_update};
pub use web::{CLIENT_CONNECTED, ClientHub, Envelope, WebServer};
