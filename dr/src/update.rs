//! Distance update wire message
//!
//! Every broadcast carries the same shape whether or not the sensor answered; a failed
//! read is sent as sentinel values with `valid: false` so clients never see a gap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensor::SensorReading;

/// Topic every distance update is published on
pub const DISTANCE_UPDATE_TOPIC: &str = "distance_update";

/// Unit of the `distance` field
pub const UNIT_CM: &str = "cm";

/// Duration reported when no reading was available
pub const SENTINEL_DURATION: i64 = -1;

/// Distances reported when no reading was available
pub const SENTINEL_DISTANCE: f64 = -1.0;

/// The message broadcast to every client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceUpdate {
    /// Distance in centimeters
    pub distance: f64,
    /// Echo pulse width in microseconds
    pub duration: i64,
    pub distance_mm: f64,
    /// When the message was formatted
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    pub unit: String,
    /// True only for strictly positive distance and duration
    pub valid: bool,
}

impl DistanceUpdate {
    /// Whether this update carries sentinel values instead of a reading
    pub fn is_sentinel(&self) -> bool {
        self.duration == SENTINEL_DURATION && self.distance == SENTINEL_DISTANCE
    }
}

/// Build the update for a reading, or the sentinel update if there is none
pub fn format_update(reading: Option<&SensorReading>, now: DateTime<Utc>) -> DistanceUpdate {
    match reading {
        Some(reading) => {
            let distance = reading.distance_mm / 10.0;
            DistanceUpdate {
                distance,
                duration: reading.duration,
                distance_mm: reading.distance_mm,
                timestamp: now,
                unit: UNIT_CM.to_string(),
                valid: distance > 0.0 && reading.duration > 0,
            }
        }
        None => DistanceUpdate {
            distance: SENTINEL_DISTANCE,
            duration: SENTINEL_DURATION,
            distance_mm: SENTINEL_DISTANCE,
            timestamp: now,
            unit: UNIT_CM.to_string(),
            valid: false,
        },
    }
}

/// ISO-8601 with an explicit `+00:00` offset and microsecond precision
mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Micros, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
