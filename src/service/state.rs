use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::protocol::Reading;

/// What the web layer shows about the running monitor
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub sensor_name: String,
    pub started_at: DateTime<Utc>,
    /// Completed poll cycles
    pub cycles: u64,
    pub latest_reading: Option<Reading>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            sensor_name: "unknown".to_string(),
            started_at: Utc::now(),
            cycles: 0,
            latest_reading: None,
        }
    }
}

impl MonitorState {
    pub fn new(sensor_name: impl Into<String>) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, reading: Reading) {
        self.cycles += 1;
        self.latest_reading = Some(reading);
    }
}

/// Thread-safe shared state
pub type SharedState = Arc<RwLock<MonitorState>>;

pub fn create_shared_state(sensor_name: impl Into<String>) -> SharedState {
    Arc::new(RwLock::new(MonitorState::new(sensor_name)))
}
