use axum::Json;
use axum::extract::{Query, State};

use crate::api::AppState;
use crate::api::models::*;
use crate::protocol::Reading;

/// GET /api/latest - Most recent reading
pub async fn latest(State(app): State<AppState>) -> Result<Json<Reading>, ApiError> {
    let state = app.monitor.read().await;

    state
        .latest_reading
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No reading taken yet"))
}

/// GET /api/history - Stored readings, oldest first
pub async fn history(
    State(app): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Some(store) = app.history.as_ref() else {
        return Err(ApiError::unavailable("History recording is not enabled"));
    };

    let readings = store
        .recent(query.effective_limit(), query.since)
        .await
        .map_err(|e| {
            tracing::error!("History query failed: {}", e);
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(HistoryResponse {
        count: readings.len(),
        readings,
    }))
}

/// GET /api/status - Monitor overview
pub async fn status(State(app): State<AppState>) -> Json<StatusResponse> {
    let state = app.monitor.read().await;

    Json(StatusResponse {
        sensor: state.sensor_name.clone(),
        started_at: state.started_at,
        cycles: state.cycles,
        last_reading_at: state.latest_reading.as_ref().map(|r| r.timestamp),
        history_enabled: app.history.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::api::routes::tests::test_state;
    use crate::processing::calibration::CalibrationBounds;

    fn reading_at(minutes_ago: i64, percent: u8) -> Reading {
        Reading::new(
            Utc::now() - Duration::minutes(minutes_ago),
            Some(500.0),
            Some(percent),
            Some(18.0),
            CalibrationBounds::default(),
        )
    }

    #[tokio::test]
    async fn test_latest_after_poll() {
        let (_dir, app) = test_state(false).await;
        let reading = reading_at(0, 62);
        app.monitor.write().await.record(reading.clone());

        let Json(latest) = latest(State(app)).await.unwrap();

        assert_eq!(latest, reading);
    }

    #[tokio::test]
    async fn test_history_since_filter() {
        let (_dir, app) = test_state(true).await;
        let store = app.history.clone().unwrap();
        store.insert(&reading_at(60, 30)).await.unwrap();
        store.insert(&reading_at(10, 40)).await.unwrap();
        store.insert(&reading_at(5, 50)).await.unwrap();

        let query = HistoryQuery {
            limit: None,
            since: Some(Utc::now() - Duration::minutes(30)),
        };
        let Json(response) = history(State(app), Query(query)).await.unwrap();

        let percents: Vec<_> = response
            .readings
            .iter()
            .map(|r| r.moisture_percent)
            .collect();
        assert_eq!(percents, vec![Some(40), Some(50)]);
    }

    #[tokio::test]
    async fn test_history_disabled() {
        let (_dir, app) = test_state(false).await;

        let err = history(State(app), Query(HistoryQuery::default()))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_status() {
        let (_dir, app) = test_state(true).await;
        app.monitor.write().await.record(reading_at(0, 55));

        let Json(status) = status(State(app)).await;

        assert_eq!(status.sensor, "scripted");
        assert_eq!(status.cycles, 1);
        assert!(status.last_reading_at.is_some());
        assert!(status.history_enabled);
    }
}
