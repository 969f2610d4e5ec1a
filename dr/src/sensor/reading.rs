//! Sensor reading types and value coercion

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::bridge::BridgeError;

/// One complete sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Echo pulse width in microseconds
    pub duration: i64,
    /// Distance in millimeters
    pub distance_mm: f64,
}

/// Why no reading was produced, for the quiet cases
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbsentReason {
    /// A query ran past its timeout
    #[error("'{method}' timed out")]
    Timeout { method: String },
    /// The bridge answered but had no value
    #[error("'{method}' returned no data")]
    NoData { method: String },
}

/// A read failure that indicates something is actually broken
#[derive(Debug, Error)]
pub enum ReadFault {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Unusable value from '{method}': {value}")]
    Coerce { method: String, value: Value },
}

/// Result of one read attempt
#[derive(Debug)]
pub enum ReadOutcome {
    Reading(SensorReading),
    Absent(AbsentReason),
    Malfunction(ReadFault),
}

impl ReadOutcome {
    /// The reading, if the attempt produced one
    pub fn reading(&self) -> Option<&SensorReading> {
        match self {
            ReadOutcome::Reading(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn is_malfunction(&self) -> bool {
        matches!(self, ReadOutcome::Malfunction(_))
    }
}

/// Coerce a bridge value to whole microseconds
///
/// Integers pass through, floats truncate toward zero, numeric strings are parsed.
pub(crate) fn coerce_duration(method: &str, value: &Value) -> Result<i64, ReadFault> {
    let coerced = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| ReadFault::Coerce {
        method: method.to_string(),
        value: value.clone(),
    })
}

/// Coerce a bridge value to millimeters
pub(crate) fn coerce_distance(method: &str, value: &Value) -> Result<f64, ReadFault> {
    let coerced = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| ReadFault::Coerce {
        method: method.to_string(),
        value: value.clone(),
    })
}
