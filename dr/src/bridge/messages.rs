//! Bridge RPC message types
//!
//! Simple JSON-over-newline protocol. Each request and response is a single line of JSON
//! followed by `\n`; responses echo the request id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::BridgeError;

/// A query sent to the bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl BridgeRequest {
    pub fn new(id: u64, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            params: Vec::new(),
        }
    }
}

/// The bridge's answer to a [`BridgeRequest`]
///
/// A `null` or missing `result` without an `error` means the bridge had no data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeResponse {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn no_data(id: u64) -> Self {
        Self {
            id,
            result: None,
            error: None,
        }
    }

    pub fn failure(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Convert into the value the caller asked `method` for
    pub fn into_result(self, method: &str) -> Result<Option<Value>, BridgeError> {
        match self.error {
            Some(message) => Err(BridgeError::Remote {
                method: method.to_string(),
                message,
            }),
            None => Ok(self.result.filter(|value| !value.is_null())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialize() {
        let req = BridgeRequest::new(7, "get_duration");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"id":7,"method":"get_duration","params":[]}"#);
    }

    #[test]
    fn test_request_deserialize_without_params() {
        let req: BridgeRequest = serde_json::from_str(r#"{"id":1,"method":"get_distance_mm"}"#).unwrap();
        assert_eq!(req, BridgeRequest::new(1, "get_distance_mm"));
    }

    #[test]
    fn test_response_success_serialize() {
        let resp = BridgeResponse::success(3, json!(500));
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"id":3,"result":500}"#);
    }

    #[test]
    fn test_response_failure_serialize() {
        let resp = BridgeResponse::failure(4, "no sensor");
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"id":4,"result":null,"error":"no sensor"}"#);
    }

    #[test]
    fn test_response_missing_result_is_no_data() {
        let resp: BridgeResponse = serde_json::from_str(r#"{"id":5}"#).unwrap();
        assert_eq!(resp.into_result("get_duration").unwrap(), None);
    }

    #[test]
    fn test_response_null_result_is_no_data() {
        let resp: BridgeResponse = serde_json::from_str(r#"{"id":5,"result":null}"#).unwrap();
        assert_eq!(resp.into_result("get_duration").unwrap(), None);
    }

    #[test]
    fn test_response_error_becomes_remote_error() {
        let resp = BridgeResponse::failure(6, "pin busy");
        match resp.into_result("get_distance_mm") {
            Err(BridgeError::Remote { method, message }) => {
                assert_eq!(method, "get_distance_mm");
                assert_eq!(message, "pin busy");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }
}
