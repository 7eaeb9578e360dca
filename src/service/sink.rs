use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::MonitorError;
use crate::forwarding::ForwardingClient;
use crate::protocol::Reading;
use crate::storage::HistoryStore;

/// Consumer of finished readings
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn accept(&self, reading: &Reading) -> Result<(), MonitorError>;

    /// Name of the sink for logging
    fn name(&self) -> &'static str;
}

/// Fans readings out to connected web clients
#[derive(Debug, Clone)]
pub struct LiveSink {
    sender: broadcast::Sender<Reading>,
}

impl LiveSink {
    pub fn new(sender: broadcast::Sender<Reading>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ReadingSink for LiveSink {
    async fn accept(&self, reading: &Reading) -> Result<(), MonitorError> {
        // No connected clients is fine
        let _ = self.sender.send(reading.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "live"
    }
}

#[async_trait]
impl ReadingSink for HistoryStore {
    async fn accept(&self, reading: &Reading) -> Result<(), MonitorError> {
        self.insert(reading).await
    }

    fn name(&self) -> &'static str {
        "history"
    }
}

/// Forwarding sink tagging readings with the sensor name
pub struct ForwardingSink {
    client: ForwardingClient,
    source: String,
}

impl ForwardingSink {
    pub fn new(client: ForwardingClient, source: impl Into<String>) -> Self {
        Self {
            client,
            source: source.into(),
        }
    }
}

#[async_trait]
impl ReadingSink for ForwardingSink {
    async fn accept(&self, reading: &Reading) -> Result<(), MonitorError> {
        self.client.post_reading(&self.source, reading).await
    }

    fn name(&self) -> &'static str {
        "forwarding"
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::processing::calibration::CalibrationBounds;

    fn reading() -> Reading {
        Reading::new(Utc::now(), Some(640.0), Some(73), Some(19.5), CalibrationBounds::default())
    }

    #[tokio::test]
    async fn test_live_sink_without_clients() {
        let (tx, _) = broadcast::channel(4);
        let sink = LiveSink::new(tx);

        assert!(sink.accept(&reading()).await.is_ok());
    }

    #[tokio::test]
    async fn test_live_sink_delivers() {
        let (tx, mut rx) = broadcast::channel(4);
        let sink = LiveSink::new(tx);
        let reading = reading();

        sink.accept(&reading).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), reading);
    }

    #[tokio::test]
    async fn test_history_sink() {
        let store = HistoryStore::in_memory().await.unwrap();
        let sink: &dyn ReadingSink = &store;

        sink.accept(&reading()).await.unwrap();

        assert_eq!(sink.name(), "history");
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
