//! Relay - turns sensor readings into broadcasts
//!
//! [`UpdateEmitter`] is the single read-format-broadcast cycle shared by the periodic
//! [`BroadcastLoop`] and the [`ConnectionGreeter`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eyre::{Context, Result};
use serde_json::Value;
use tracing::{debug, error};

use crate::sensor::{ReadOutcome, SensorReader, SensorReading};
use crate::update::{DISTANCE_UPDATE_TOPIC, DistanceUpdate, format_update};

mod broadcast_loop;
mod greeter;

pub use broadcast_loop::BroadcastLoop;
pub use greeter::ConnectionGreeter;

/// Pause before the loop resumes after a failed cycle
pub const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Ticks between "still running" status lines
pub const STATUS_EVERY_TICKS: u64 = 50;

/// Seconds each tick counts for in the status line's nominal elapsed time
pub const STATUS_SECONDS_PER_TICK: f64 = 0.1;

/// Fire-and-forget delivery of a named message to every connected client
pub trait BroadcastSink: Send + Sync {
    fn send_message(&self, topic: &str, payload: Value) -> Result<()>;
}

/// Result of one emit cycle
#[derive(Debug, Clone)]
pub struct Emission {
    /// What was broadcast
    pub update: DistanceUpdate,
    /// The reading behind it, if the sensor answered
    pub reading: Option<SensorReading>,
}

/// One read-format-broadcast cycle
#[derive(Clone)]
pub struct UpdateEmitter {
    reader: SensorReader,
    sink: Arc<dyn BroadcastSink>,
}

impl UpdateEmitter {
    pub fn new(reader: SensorReader, sink: Arc<dyn BroadcastSink>) -> Self {
        Self { reader, sink }
    }

    /// Read the sensor, format the update and hand it to the sink
    ///
    /// A missing reading still broadcasts the sentinel update. Only a sensor malfunction
    /// is logged here; timeouts and empty replies stay quiet. Errors come from
    /// serialization or the sink.
    pub async fn emit(&self) -> Result<Emission> {
        debug!("UpdateEmitter::emit: called");
        let outcome = self.reader.read().await;
        if let ReadOutcome::Malfunction(fault) = &outcome {
            error!("Error reading sensor data: {}", fault);
        }

        let reading = outcome.reading().copied();
        let update = format_update(reading.as_ref(), Utc::now());
        let payload = serde_json::to_value(&update).context("Failed to serialize distance update")?;
        self.sink
            .send_message(DISTANCE_UPDATE_TOPIC, payload)
            .context("Failed to broadcast distance update")?;

        debug!(valid = update.valid, "UpdateEmitter::emit: sent");
        Ok(Emission { update, reading })
    }
}

#[cfg(test)]
pub mod mock {
    //! Recording sink and log capture for relay tests

    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use eyre::Result;
    use serde_json::Value;
    use tokio::time::Instant;
    use tracing::subscriber::DefaultGuard;

    use super::BroadcastSink;
    use crate::update::DistanceUpdate;

    /// Sink that records every message, optionally failing the first few sends
    #[derive(Default)]
    pub struct RecordingSink {
        attempts: Mutex<Vec<Instant>>,
        sent: Mutex<Vec<(Instant, String, Value)>>,
        failures_left: AtomicUsize,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_first(failures: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(failures),
                ..Self::default()
            }
        }

        /// When each send was attempted, successful or not
        pub fn attempts(&self) -> Vec<Instant> {
            self.attempts.lock().unwrap().clone()
        }

        /// When each successful send happened
        pub fn sent_at(&self) -> Vec<Instant> {
            self.sent.lock().unwrap().iter().map(|(at, _, _)| *at).collect()
        }

        pub fn topics(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, topic, _)| topic.clone()).collect()
        }

        pub fn updates(&self) -> Vec<DistanceUpdate> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, payload)| serde_json::from_value(payload.clone()).unwrap())
                .collect()
        }
    }

    impl BroadcastSink for RecordingSink {
        fn send_message(&self, topic: &str, payload: Value) -> Result<()> {
            let now = Instant::now();
            self.attempts.lock().unwrap().push(now);

            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(eyre::eyre!("sink unavailable"));
            }

            self.sent.lock().unwrap().push((now, topic.to_string(), payload));
            Ok(())
        }
    }

    /// Log output captured for the current thread
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        pub fn has_errors(&self) -> bool {
            self.contents().contains("ERROR")
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Capture WARN and above until the guard is dropped
    pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
        capture_logs_at(tracing::Level::WARN)
    }

    /// Capture `level` and above until the guard is dropped
    pub fn capture_logs_at(level: tracing::Level) -> (CapturedLogs, DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(level)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{RecordingSink, capture_logs};
    use super::*;
    use crate::bridge::BridgeError;
    use crate::bridge::mock::MockBridge;
    use serde_json::json;

    fn emitter_with(bridge: MockBridge, sink: Arc<RecordingSink>) -> UpdateEmitter {
        UpdateEmitter::new(SensorReader::new(Arc::new(bridge)), sink)
    }

    fn timeout(method: &str) -> BridgeError {
        BridgeError::Timeout {
            method: method.to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_emit_valid_reading() {
        let sink = Arc::new(RecordingSink::new());
        let emitter = emitter_with(MockBridge::reading(json!(500), json!(85.3)), sink.clone());

        let emission = emitter.emit().await.unwrap();

        assert_eq!(emission.update.distance, 8.53);
        assert_eq!(emission.update.duration, 500);
        assert!(emission.update.valid);
        assert_eq!(emission.reading.map(|r| r.duration), Some(500));
        assert_eq!(sink.topics(), vec!["distance_update".to_string()]);
        assert_eq!(sink.updates(), vec![emission.update]);
    }

    #[tokio::test]
    async fn test_emit_timeout_sends_sentinel_quietly() {
        let (logs, _guard) = capture_logs();
        let sink = Arc::new(RecordingSink::new());
        let bridge = MockBridge::new(vec![Err(timeout("get_duration"))]);
        let emitter = emitter_with(bridge, sink.clone());

        let emission = emitter.emit().await.unwrap();

        assert!(emission.update.is_sentinel());
        assert!(!emission.update.valid);
        assert!(emission.reading.is_none());
        assert_eq!(sink.updates().len(), 1);
        assert!(!logs.has_errors(), "unexpected log output: {}", logs.contents());
    }

    #[tokio::test]
    async fn test_emit_no_data_sends_sentinel_quietly() {
        let (logs, _guard) = capture_logs();
        let sink = Arc::new(RecordingSink::new());
        let emitter = emitter_with(MockBridge::new(vec![Ok(None), Ok(Some(json!(10.0)))]), sink.clone());

        let emission = emitter.emit().await.unwrap();

        assert!(emission.update.is_sentinel());
        assert!(!logs.has_errors());
    }

    #[tokio::test]
    async fn test_emit_malfunction_logs_and_sends_sentinel() {
        let (logs, _guard) = capture_logs();
        let sink = Arc::new(RecordingSink::new());
        let bridge = MockBridge::new(vec![Err(BridgeError::Protocol("bad frame".to_string()))]);
        let emitter = emitter_with(bridge, sink.clone());

        let emission = emitter.emit().await.unwrap();

        assert!(emission.update.is_sentinel());
        assert_eq!(sink.updates().len(), 1);
        assert!(logs.has_errors());
        assert!(logs.contents().contains("Error reading sensor data"));
    }

    #[tokio::test]
    async fn test_emit_zero_reading_is_invalid_but_not_sentinel() {
        let sink = Arc::new(RecordingSink::new());
        let emitter = emitter_with(MockBridge::reading(json!(0), json!(0.0)), sink);

        let emission = emitter.emit().await.unwrap();

        assert!(!emission.update.valid);
        assert!(!emission.update.is_sentinel());
        assert!(emission.reading.is_some());
    }

    #[tokio::test]
    async fn test_emit_sink_failure_is_error() {
        let sink = Arc::new(RecordingSink::failing_first(1));
        let emitter = emitter_with(MockBridge::reading(json!(500), json!(85.3)), sink.clone());

        assert!(emitter.emit().await.is_err());
        assert_eq!(sink.attempts().len(), 1);
        assert!(sink.updates().is_empty());
    }
}
