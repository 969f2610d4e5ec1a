//! SensorReader - queries the bridge for one sample

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::reading::{AbsentReason, ReadFault, ReadOutcome, SensorReading, coerce_distance, coerce_duration};
use super::{GET_DISTANCE_MM, GET_DURATION, QUERY_TIMEOUT};
use crate::bridge::Bridge;

/// Reads the ultrasonic sensor through the bridge
///
/// Each read issues `get_duration` then `get_distance_mm`, strictly in that order,
/// each with its own timeout. The reader never logs; callers decide what to report.
#[derive(Clone)]
pub struct SensorReader {
    bridge: Arc<dyn Bridge>,
    timeout: Duration,
}

impl SensorReader {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self::with_timeout(bridge, QUERY_TIMEOUT)
    }

    pub fn with_timeout(bridge: Arc<dyn Bridge>, timeout: Duration) -> Self {
        debug!(?timeout, "SensorReader::with_timeout: called");
        Self { bridge, timeout }
    }

    /// Take one sample
    pub async fn read(&self) -> ReadOutcome {
        debug!("SensorReader::read: called");
        let duration = match self.query(GET_DURATION).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };
        let distance_mm = match self.query(GET_DISTANCE_MM).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let (duration, distance_mm) = match (duration, distance_mm) {
            (Some(duration), Some(distance_mm)) => (duration, distance_mm),
            (None, _) => {
                debug!("SensorReader::read: no duration");
                return ReadOutcome::Absent(AbsentReason::NoData {
                    method: GET_DURATION.to_string(),
                });
            }
            (_, None) => {
                debug!("SensorReader::read: no distance");
                return ReadOutcome::Absent(AbsentReason::NoData {
                    method: GET_DISTANCE_MM.to_string(),
                });
            }
        };

        let reading = coerce_duration(GET_DURATION, &duration).and_then(|duration| {
            Ok(SensorReading {
                duration,
                distance_mm: coerce_distance(GET_DISTANCE_MM, &distance_mm)?,
            })
        });

        match reading {
            Ok(reading) => {
                debug!(?reading, "SensorReader::read: got reading");
                ReadOutcome::Reading(reading)
            }
            Err(fault) => ReadOutcome::Malfunction(fault),
        }
    }

    /// Run one query, mapping failures straight to the outcome they imply
    async fn query(&self, method: &str) -> Result<Option<Value>, ReadOutcome> {
        match self.bridge.call(method, self.timeout).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_timeout() => {
                debug!(%method, "SensorReader::query: timed out");
                Err(ReadOutcome::Absent(AbsentReason::Timeout {
                    method: method.to_string(),
                }))
            }
            Err(e) => Err(ReadOutcome::Malfunction(ReadFault::Bridge(e))),
        }
    }
}
