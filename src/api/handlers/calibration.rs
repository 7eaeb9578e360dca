use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::api::AppState;
use crate::api::models::*;
use crate::error::CalibrationError;
use crate::processing::calibration::CalibrationBounds;

/// GET /api/calibration - Bounds currently used for normalization
pub async fn get_calibration(State(app): State<AppState>) -> Json<CalibrationResponse> {
    Json(app.calibrator.current().await.into())
}

/// POST /api/calibration - Replace the bounds
pub async fn set_calibration(
    State(app): State<AppState>,
    payload: Result<Json<CalibrationRequest>, JsonRejection>,
) -> Result<Json<CalibrationResponse>, ApiError> {
    let Json(request) = payload?;
    let bounds = CalibrationBounds::new(request.min_raw, request.max_raw)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let bounds = app.calibrator.replace(bounds).await.map_err(persist_error)?;

    tracing::info!(
        "Calibration set to {}..{}",
        bounds.min_raw(),
        bounds.max_raw()
    );

    Ok(Json(bounds.into()))
}

/// POST /api/calibration/reset - Back to the default bounds
pub async fn reset_calibration(
    State(app): State<AppState>,
) -> Result<Json<CalibrationResponse>, ApiError> {
    let bounds = app.calibrator.reset().await.map_err(persist_error)?;
    Ok(Json(bounds.into()))
}

fn persist_error(e: CalibrationError) -> ApiError {
    tracing::error!("Failed to persist calibration: {}", e);
    ApiError::internal(e.to_string())
}
