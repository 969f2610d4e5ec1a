//! Unix socket bridge client
//!
//! Opens one connection per call, writes a single JSON request line and waits for the
//! matching response line. The caller's timeout bounds connect, write and read together.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::messages::{BridgeRequest, BridgeResponse};
use super::{Bridge, BridgeError};

/// Maximum response size; sensor values are a few bytes
const MAX_MESSAGE_SIZE: usize = 1024;

/// Bridge reached through a Unix domain socket
#[derive(Debug)]
pub struct SocketBridge {
    socket_path: PathBuf,
    next_id: AtomicU64,
}

impl SocketBridge {
    pub fn new(socket_path: PathBuf) -> Self {
        debug!(?socket_path, "SocketBridge::new: called");
        Self {
            socket_path,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Check if the bridge socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    async fn exchange(&self, request: &BridgeRequest) -> Result<BridgeResponse, BridgeError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| BridgeError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let request_json = serde_json::to_string(request)?;
        stream.write_all(request_json.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;

        // One byte past the cap is enough to tell an oversized reply apart
        let mut reader = BufReader::new((&mut stream).take(MAX_MESSAGE_SIZE as u64 + 1));
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Err(BridgeError::Protocol(
                "Bridge closed the connection without a response".to_string(),
            ));
        }
        if bytes_read > MAX_MESSAGE_SIZE {
            return Err(BridgeError::Protocol(format!("Response too large: {} bytes", bytes_read)));
        }

        let response: BridgeResponse = serde_json::from_str(line.trim())?;
        debug!(?response, "SocketBridge::exchange: received response");
        Ok(response)
    }
}

#[async_trait]
impl Bridge for SocketBridge {
    async fn call(&self, method: &str, timeout: Duration) -> Result<Option<Value>, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(%method, id, ?timeout, "SocketBridge::call: called");
        let request = BridgeRequest::new(id, method);

        let response = match tokio::time::timeout(timeout, self.exchange(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                debug!(%method, id, "SocketBridge::call: timed out");
                return Err(BridgeError::Timeout {
                    method: method.to_string(),
                    timeout,
                });
            }
        };

        if response.id != id {
            return Err(BridgeError::Protocol(format!(
                "Response id {} does not match request id {}",
                response.id, id
            )));
        }

        response.into_result(method)
    }
}
