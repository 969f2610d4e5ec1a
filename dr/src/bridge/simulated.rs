//! In-process stand-in for the hardware bridge
//!
//! Sweeps a virtual target back and forth between 20 mm and 2 m and answers the same
//! queries the microcontroller sketch does, deriving distance from the echo pulse
//! width. Lets the relay and the browser page run on a laptop with no sensor attached.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use super::{Bridge, BridgeError};
use crate::sensor::{GET_DISTANCE_MM, GET_DURATION};

/// Speed of sound at room temperature in millimeters per microsecond
pub const SPEED_OF_SOUND_MM_PER_US: f64 = 0.343;

const MIN_DISTANCE_MM: f64 = 20.0;
const MAX_DISTANCE_MM: f64 = 2000.0;

/// Readings per one-way sweep
const SWEEP_STEPS: u64 = 100;

/// Fraction of duration queries answered with no data
const DEFAULT_DROPOUT: f64 = 0.02;

/// Convert a round-trip echo time into a one-way distance
pub fn duration_to_distance_mm(duration_us: u64) -> f64 {
    duration_us as f64 * SPEED_OF_SOUND_MM_PER_US / 2.0
}

fn target_distance_mm(step: u64) -> f64 {
    let phase = step % (2 * SWEEP_STEPS);
    let position = if phase < SWEEP_STEPS {
        phase
    } else {
        2 * SWEEP_STEPS - phase
    };
    MIN_DISTANCE_MM + (MAX_DISTANCE_MM - MIN_DISTANCE_MM) * position as f64 / SWEEP_STEPS as f64
}

#[derive(Debug, Default)]
struct SimState {
    step: u64,
    last_duration: Option<u64>,
}

/// Simulated ultrasonic sensor behind a bridge
#[derive(Debug)]
pub struct SimulatedBridge {
    state: Mutex<SimState>,
    dropout: f64,
}

impl Default for SimulatedBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBridge {
    pub fn new() -> Self {
        debug!("SimulatedBridge::new: called");
        Self::with_dropout(DEFAULT_DROPOUT)
    }

    /// Create a simulator that drops the given fraction of duration queries
    pub fn with_dropout(dropout: f64) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            dropout: dropout.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl Bridge for SimulatedBridge {
    async fn call(&self, method: &str, _timeout: Duration) -> Result<Option<Value>, BridgeError> {
        debug!(%method, "SimulatedBridge::call: called");
        let mut state = self.state.lock().await;

        match method {
            GET_DURATION => {
                if rand::rng().random_bool(self.dropout) {
                    debug!("SimulatedBridge::call: dropping reading");
                    state.last_duration = None;
                    return Ok(None);
                }
                let target = target_distance_mm(state.step);
                state.step += 1;
                let duration = (target * 2.0 / SPEED_OF_SOUND_MM_PER_US).round() as u64;
                state.last_duration = Some(duration);
                Ok(Some(json!(duration)))
            }
            GET_DISTANCE_MM => Ok(state.last_duration.map(|d| json!(duration_to_distance_mm(d)))),
            other => Err(BridgeError::Remote {
                method: other.to_string(),
                message: "unknown method".to_string(),
            }),
        }
    }
}
