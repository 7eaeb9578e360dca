use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::broadcast;

use super::handlers::{calibration, live, page, readings};
use crate::protocol::Reading;
use crate::service::SharedState;
use crate::service::calibrator::Calibrator;
use crate::storage::HistoryStore;

/// Everything the handlers need
#[derive(Debug, Clone)]
pub struct AppState {
    pub monitor: SharedState,
    pub calibrator: Arc<Calibrator>,
    /// Absent when no database was configured
    pub history: Option<HistoryStore>,
    pub live: broadcast::Sender<Reading>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Live page and its update stream
        .route("/", get(page::index))
        .route("/ws", get(live::live_updates))
        // Readings
        .route("/api/latest", get(readings::latest))
        .route("/api/history", get(readings::history))
        .route("/api/status", get(readings::status))
        // Calibration
        .route(
            "/api/calibration",
            get(calibration::get_calibration).post(calibration::set_calibration),
        )
        .route(
            "/api/calibration/reset",
            post(calibration::reset_calibration),
        )
        .with_state(state)
}
