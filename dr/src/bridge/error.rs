//! Bridge error types

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while querying the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Bridge call '{method}' timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("Failed to connect to bridge at {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bridge I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bridge protocol error: {0}")]
    Protocol(String),

    #[error("Bridge error for '{method}': {message}")]
    Remote { method: String, message: String },
}

impl BridgeError {
    /// Check if the call ran out of time
    ///
    /// Timeouts are routine on a busy serial link and are not reported as faults.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        let err = BridgeError::Timeout {
            method: "get_duration".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(err.is_timeout());

        assert!(!BridgeError::Protocol("garbled".to_string()).is_timeout());
        assert!(
            !BridgeError::Remote {
                method: "get_duration".to_string(),
                message: "sensor not attached".to_string()
            }
            .is_timeout()
        );
    }

    #[test]
    fn test_display_includes_method() {
        let err = BridgeError::Remote {
            method: "get_distance_mm".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Bridge error for 'get_distance_mm': boom");
    }

    #[test]
    fn test_connect_display_includes_path() {
        let err = BridgeError::Connect {
            path: PathBuf::from("/run/bridge.sock"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/run/bridge.sock"));
    }
}
