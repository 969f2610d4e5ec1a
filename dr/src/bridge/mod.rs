//! Hardware bridge access
//!
//! The bridge is the process that owns the microcontroller link and answers named,
//! timeout-bounded queries such as `get_duration`. The relay only ever talks to it
//! through the [`Bridge`] trait so the sensor logic can run against the real socket,
//! the in-process simulator, or a scripted mock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

mod error;
pub mod messages;
mod simulated;
mod socket;

pub use error::BridgeError;
pub use messages::{BridgeRequest, BridgeResponse};
pub use simulated::SimulatedBridge;
pub use socket::SocketBridge;

use crate::config::BridgeConfig;

/// A named-query interface to the hardware bridge
///
/// `Ok(None)` means the bridge is alive but had no value to report.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Invoke `method` and wait at most `timeout` for its result
    async fn call(&self, method: &str, timeout: Duration) -> Result<Option<Value>, BridgeError>;
}

/// Create the bridge selected by the configuration
pub fn create_bridge(config: &BridgeConfig) -> Arc<dyn Bridge> {
    debug!(simulate = config.simulate, socket_path = ?config.socket_path, "create_bridge: called");
    if config.simulate {
        debug!("create_bridge: creating simulated bridge");
        Arc::new(SimulatedBridge::new())
    } else {
        debug!("create_bridge: creating socket bridge");
        Arc::new(SocketBridge::new(config.socket_path.clone()))
    }
}
