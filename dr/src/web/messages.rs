//! WebSocket frame envelope
//!
//! Every text frame in either direction is one JSON object naming an event and carrying
//! its data, e.g. `{"event":"distance_update","data":{...}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event dispatched by the server itself when a client finishes the handshake
pub const CLIENT_CONNECTED: &str = "client_connected";

/// One named event with its payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serialize() {
        let envelope = Envelope::new("distance_update", json!({"distance": 8.53}));
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"event":"distance_update","data":{"distance":8.53}}"#);
    }

    #[test]
    fn test_envelope_deserialize_without_data() {
        let envelope: Envelope = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(envelope, Envelope::new("ping", Value::Null));
    }

    #[test]
    fn test_envelope_rejects_missing_event() {
        assert!(serde_json::from_str::<Envelope>(r#"{"data":{}}"#).is_err());
    }
}
