use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{DeviceRegistry, ReadingStore, StoreError};
use crate::services::readings::{Device, Reading, Window};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    default_check_interval_minutes: u32,
}

impl PgStore {
    pub fn new(pool: PgPool, default_check_interval_minutes: u32) -> Self {
        Self {
            pool,
            default_check_interval_minutes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReadingRow {
    device_id: String,
    ts: DateTime<Utc>,
    soil_moisture: Option<f64>,
    humidity: Option<f64>,
    temperature: Option<f64>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Self {
            device_id: row.device_id,
            timestamp: row.ts,
            soil_moisture: row.soil_moisture,
            humidity: row.humidity,
            temperature: row.temperature,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    device_id: String,
    name: Option<String>,
    check_interval_minutes: Option<i32>,
}

impl PgStore {
    fn device_from_row(&self, row: DeviceRow) -> Device {
        let check_interval_minutes = row
            .check_interval_minutes
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(self.default_check_interval_minutes);
        Device {
            device_id: row.device_id,
            name: row.name,
            check_interval_minutes,
        }
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn query(&self, device_id: &str, window: &Window) -> Result<Vec<Reading>, StoreError> {
        if window.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT device_id, ts, soil_moisture, humidity, temperature
            FROM sensor_readings
            WHERE device_id = $1 AND ts >= $2 AND ts < $3
            ORDER BY ts ASC
            "#,
        )
        .bind(device_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    async fn latest(&self, device_id: &str) -> Result<Option<Reading>, StoreError> {
        let row: Option<ReadingRow> = sqlx::query_as(
            r#"
            SELECT device_id, ts, soil_moisture, humidity, temperature
            FROM sensor_readings
            WHERE device_id = $1
            ORDER BY ts DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Reading::from))
    }

    async fn insert(&self, reading: &Reading) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sensor_readings (device_id, ts, soil_moisture, humidity, temperature)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&reading.device_id)
        .bind(reading.timestamp)
        .bind(reading.soil_moisture)
        .bind(reading.humidity)
        .bind(reading.temperature)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for PgStore {
    async fn device(&self, device_id: &str) -> Result<Option<Device>, StoreError> {
        let row: Option<DeviceRow> = sqlx::query_as(
            r#"
            SELECT device_id, name, check_interval_minutes
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| self.device_from_row(row)))
    }

    async fn devices(&self) -> Result<Vec<Device>, StoreError> {
        let rows: Vec<DeviceRow> = sqlx::query_as(
            r#"
            SELECT device_id, name, check_interval_minutes
            FROM devices
            ORDER BY device_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| self.device_from_row(row))
            .collect())
    }
}
