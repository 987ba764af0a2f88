use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::sync::Arc;

use super::buckets::bucketize;
use super::device_status::{self, DeviceStatus};
use super::readings::{Device, Field, Reading, Window};
use super::rotation::{anchor_hour, rotate, RotatedProfile};
use super::window::WindowResolver;
use super::QueryError;
use crate::store::{DeviceRegistry, ReadingStore};

/// How the hour-of-day profile is labelled on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// First slot is the hour after `now`, ending at the current hour.
    Rolling,
    /// Midnight-to-midnight order.
    Fixed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub device: Device,
    pub status: DeviceStatus,
    pub latest: Option<Reading>,
}

/// Read-side composition of window resolution, store access, bucketing and
/// rotation. Holds no per-query state; every call builds its profile fresh.
#[derive(Clone)]
pub struct TelemetryQueries {
    store: Arc<dyn ReadingStore>,
    registry: Arc<dyn DeviceRegistry>,
    resolver: WindowResolver,
}

impl TelemetryQueries {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        registry: Arc<dyn DeviceRegistry>,
        resolver: WindowResolver,
    ) -> Self {
        Self {
            store,
            registry,
            resolver,
        }
    }

    pub fn resolver(&self) -> &WindowResolver {
        &self.resolver
    }

    async fn require_device(&self, device_id: &str) -> Result<Device, QueryError> {
        self.registry
            .device(device_id)
            .await?
            .ok_or_else(|| QueryError::DeviceNotFound(device_id.to_string()))
    }

    pub async fn raw_range(
        &self,
        device_id: &str,
        window: &Window,
    ) -> Result<Vec<Reading>, QueryError> {
        self.require_device(device_id).await?;
        let mut readings = self.store.query(device_id, window).await?;
        readings.sort_by_key(|reading| reading.timestamp);
        Ok(readings)
    }

    pub async fn hourly_average(
        &self,
        device_id: &str,
        window: &Window,
        field: Field,
        now: DateTime<Utc>,
        rotation: Rotation,
    ) -> Result<RotatedProfile, QueryError> {
        self.require_device(device_id).await?;
        let readings = self.store.query(device_id, window).await?;
        let tz = self.resolver.timezone();
        let profile = bucketize(&readings, field, tz);
        let anchor = match rotation {
            Rotation::Rolling => anchor_hour(now, tz),
            Rotation::Fixed => 0,
        };
        tracing::debug!(
            device_id = %device_id,
            field = %field,
            readings = readings.len(),
            anchor,
            "built hourly profile"
        );
        Ok(rotate(&profile, anchor))
    }

    pub async fn latest(&self, device_id: &str) -> Result<Option<Reading>, QueryError> {
        self.require_device(device_id).await?;
        Ok(self.store.latest(device_id).await?)
    }

    pub fn status(
        &self,
        device: &Device,
        latest: Option<&Reading>,
        now: DateTime<Utc>,
    ) -> DeviceStatus {
        let last_reading_at = latest.map(|reading| reading.timestamp);
        let liveness =
            device_status::evaluate(device.check_interval_minutes, last_reading_at, now);
        DeviceStatus {
            device_id: device.device_id.clone(),
            is_online: liveness.is_online(),
            status: liveness,
            last_reading_at,
        }
    }

    pub async fn device_snapshot(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DeviceSnapshot, QueryError> {
        let device = self.require_device(device_id).await?;
        let latest = self.store.latest(device_id).await?;
        Ok(self.snapshot(device, latest, now))
    }

    /// Status and latest reading for every registered device. Lookups run
    /// concurrently; the first store failure aborts the whole call.
    pub async fn fleet_snapshot(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeviceSnapshot>, QueryError> {
        let devices = self.registry.devices().await?;
        let latest = try_join_all(
            devices
                .iter()
                .map(|device| self.store.latest(&device.device_id)),
        )
        .await?;
        Ok(devices
            .into_iter()
            .zip(latest)
            .map(|(device, latest)| self.snapshot(device, latest, now))
            .collect())
    }

    /// Appends a reading for a registered device.
    pub async fn record(&self, reading: Reading) -> Result<Reading, QueryError> {
        self.require_device(&reading.device_id).await?;
        self.store.insert(&reading).await?;
        tracing::debug!(
            device_id = %reading.device_id,
            timestamp = %reading.timestamp.to_rfc3339(),
            "recorded reading"
        );
        Ok(reading)
    }

    fn snapshot(
        &self,
        device: Device,
        latest: Option<Reading>,
        now: DateTime<Utc>,
    ) -> DeviceSnapshot {
        let status = self.status(&device, latest.as_ref(), now);
        DeviceSnapshot {
            device,
            status,
            latest,
        }
    }
}
