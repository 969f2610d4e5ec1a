//! ConnectionGreeter - immediate update for newly connected clients

use std::sync::Arc;

use eyre::Result;
use serde_json::Value;
use tracing::{debug, error, info};

use super::UpdateEmitter;
use crate::update::DistanceUpdate;
use crate::web::MessageHandler;

/// Sends one fresh reading whenever a client connects
///
/// The broadcast goes to every client, not only the new one, and runs outside the
/// periodic loop's schedule.
pub struct ConnectionGreeter {
    emitter: UpdateEmitter,
}

impl ConnectionGreeter {
    pub fn new(emitter: UpdateEmitter) -> Self {
        Self { emitter }
    }

    /// Handle a `client_connected` event
    pub async fn on_client_connected(&self, client_id: &str, data: &Value) -> Result<DistanceUpdate> {
        debug!(%client_id, ?data, "ConnectionGreeter::on_client_connected: called");
        info!("Client connected: {}", client_id);

        let emission = self.emitter.emit().await?;
        match &emission.reading {
            Some(reading) => info!(
                "Sent initial distance: {:.2} cm ({:.2} mm), Duration: {} us",
                emission.update.distance, reading.distance_mm, reading.duration
            ),
            None => info!("Sent initial message (sensor reading failed)"),
        }
        Ok(emission.update)
    }

    /// Wrap the greeter as a hub event handler
    pub fn handler(self: Arc<Self>) -> MessageHandler {
        Arc::new(move |client_id, data| {
            let greeter = self.clone();
            Box::pin(async move {
                if let Err(e) = greeter.on_client_connected(&client_id, &data).await {
                    error!("Failed to greet client {}: {:?}", client_id, e);
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeError;
    use crate::bridge::mock::MockBridge;
    use crate::relay::mock::{RecordingSink, capture_logs};
    use crate::sensor::SensorReader;
    use serde_json::json;
    use std::time::Duration;

    fn greeter_with(bridge: MockBridge, sink: Arc<RecordingSink>) -> ConnectionGreeter {
        ConnectionGreeter::new(UpdateEmitter::new(SensorReader::new(Arc::new(bridge)), sink))
    }

    #[tokio::test]
    async fn test_greeting_broadcasts_one_update() {
        let sink = Arc::new(RecordingSink::new());
        let greeter = greeter_with(MockBridge::reading(json!(500), json!(85.3)), sink.clone());

        let update = greeter.on_client_connected("client-1", &json!({})).await.unwrap();

        assert_eq!(update.distance, 8.53);
        assert!(update.valid);
        assert_eq!(sink.topics(), vec!["distance_update".to_string()]);
    }

    #[tokio::test]
    async fn test_greeting_with_failed_read_sends_sentinel() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = MockBridge::new(vec![Err(BridgeError::Timeout {
            method: "get_duration".to_string(),
            timeout: Duration::from_secs(1),
        })]);
        let greeter = greeter_with(bridge, sink.clone());

        let update = greeter.on_client_connected("client-1", &Value::Null).await.unwrap();

        assert!(update.is_sentinel());
        assert_eq!(sink.updates(), vec![update]);
    }

    #[tokio::test]
    async fn test_handler_reports_sink_failure() {
        let (logs, _guard) = capture_logs();
        let sink = Arc::new(RecordingSink::failing_first(1));
        let greeter = Arc::new(greeter_with(MockBridge::reading(json!(500), json!(85.3)), sink.clone()));

        let handler = greeter.handler();
        handler("client-9".to_string(), Value::Null).await;

        assert_eq!(sink.attempts().len(), 1);
        assert!(logs.contents().contains("Failed to greet client client-9"));
    }

    #[tokio::test]
    async fn test_each_connect_is_one_emission() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = MockBridge::new(vec![
            Ok(Some(json!(500))),
            Ok(Some(json!(85.3))),
            Ok(Some(json!(600))),
            Ok(Some(json!(102.9))),
        ]);
        let greeter = Arc::new(greeter_with(bridge, sink.clone()));
        let handler = greeter.handler();

        handler("a".to_string(), Value::Null).await;
        handler("b".to_string(), Value::Null).await;

        let updates = sink.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].duration, 600);
    }
}
