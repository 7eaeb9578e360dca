use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::MonitorError;
use crate::protocol::Reading;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sensor_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    moisture_raw REAL,
    moisture_percent INTEGER,
    temperature REAL,
    min_raw INTEGER NOT NULL,
    max_raw INTEGER NOT NULL,
    moisture_samples INTEGER NOT NULL DEFAULT 0,
    temperature_samples INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS sensor_data_timestamp ON sensor_data (timestamp);
";

/// Readings history in a local SQLite database
#[derive(Debug, Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    /// Open (creating if needed) the database file
    pub async fn open(path: &Path) -> Result<Self, MonitorError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self::with_pool(pool).await?;
        tracing::info!(
            "Recording readings to {} ({} stored)",
            path.display(),
            store.count().await?
        );
        Ok(store)
    }

    /// Private in-memory database; one connection so every query sees the same data
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, MonitorError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, MonitorError> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn insert(&self, reading: &Reading) -> Result<(), MonitorError> {
        sqlx::query(
            "INSERT INTO sensor_data
                (timestamp, moisture_raw, moisture_percent, temperature,
                 min_raw, max_raw, moisture_samples, temperature_samples)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(reading.timestamp)
        .bind(reading.moisture_raw)
        .bind(reading.moisture_percent)
        .bind(reading.temperature)
        .bind(reading.min_raw)
        .bind(reading.max_raw)
        .bind(reading.moisture_samples)
        .bind(reading.temperature_samples)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The `limit` most recent readings at or after `since`, oldest first
    pub async fn recent(
        &self,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Reading>, MonitorError> {
        let mut rows: Vec<Reading> = sqlx::query_as(
            "SELECT timestamp, moisture_raw, moisture_percent, temperature,
                    min_raw, max_raw, moisture_samples, temperature_samples
             FROM sensor_data
             WHERE ?1 IS NULL OR timestamp >= ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64, MonitorError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sensor_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
