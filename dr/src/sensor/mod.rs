//! Distance sensor reading
//!
//! Turns the bridge's two raw queries into one [`ReadOutcome`]. Timeouts and empty replies
//! are ordinary on a serial link and come back as [`ReadOutcome::Absent`]; anything else
//! that goes wrong is a [`ReadOutcome::Malfunction`] the caller is expected to report.

use std::time::Duration;

mod reader;
mod reading;

pub use reader::SensorReader;
pub use reading::{AbsentReason, ReadFault, ReadOutcome, SensorReading};

/// Bridge method returning the echo pulse width in microseconds
pub const GET_DURATION: &str = "get_duration";

/// Bridge method returning the computed distance in millimeters
pub const GET_DISTANCE_MM: &str = "get_distance_mm";

/// Per-query timeout
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(1);
