use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::processing::calibration::CalibrationBounds;
use crate::protocol::Reading;

// ============= Readings =============

pub const DEFAULT_HISTORY_LIMIT: u32 = 100;
pub const MAX_HISTORY_LIMIT: u32 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    /// Only readings at or after this instant (RFC 3339)
    pub since: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub readings: Vec<Reading>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub sensor: String,
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub history_enabled: bool,
}

// ============= Calibration =============

#[derive(Debug, Deserialize)]
pub struct CalibrationRequest {
    pub min_raw: u16,
    pub max_raw: u16,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CalibrationResponse {
    pub min_raw: u16,
    pub max_raw: u16,
}

impl From<CalibrationBounds> for CalibrationResponse {
    fn from(bounds: CalibrationBounds) -> Self {
        Self {
            min_raw: bounds.min_raw(),
            max_raw: bounds.max_raw(),
        }
    }
}

// ============= Error Response =============

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler failure rendered as `{"error": ...}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Unreadable request bodies answer 400 with the usual error body
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
