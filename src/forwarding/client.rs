use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::error::MonitorError;
use crate::protocol::Reading;

/// HTTP client pushing each reading to a remote collector
pub struct ForwardingClient {
    client: Client,
    url: String,
}

/// Body posted to the collector
#[derive(Debug, Serialize)]
struct ReadingPayload<'a> {
    source: &'a str,
    timestamp: String,
    moisture_raw: Option<f64>,
    moisture_percent: Option<u8>,
    temperature: Option<f64>,
    min_raw: u16,
    max_raw: u16,
}

impl<'a> ReadingPayload<'a> {
    fn new(source: &'a str, reading: &Reading) -> Self {
        Self {
            source,
            timestamp: reading.timestamp.to_rfc3339(),
            moisture_raw: reading.moisture_raw,
            moisture_percent: reading.moisture_percent,
            temperature: reading.temperature,
            min_raw: reading.min_raw,
            max_raw: reading.max_raw,
        }
    }
}

impl ForwardingClient {
    pub fn new(url: impl Into<String>) -> Result<Self, MonitorError> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one reading; non-2xx answers are errors
    pub async fn post_reading(&self, source: &str, reading: &Reading) -> Result<(), MonitorError> {
        let payload = ReadingPayload::new(source, reading);

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Collector rejected reading: {} - {}", status, body);
            return Err(MonitorError::DataSource(format!(
                "Collector returned {}",
                status
            )));
        }

        tracing::debug!("Forwarded reading to {}", self.url);
        Ok(())
    }
}
