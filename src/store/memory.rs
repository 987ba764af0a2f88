use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{DeviceRegistry, ReadingStore, StoreError};
use crate::services::readings::{Device, Reading, Window};

/// In-process store. Each device partition is kept sorted by timestamp;
/// readings with equal timestamps keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    devices: RwLock<BTreeMap<String, Device>>,
    readings: RwLock<HashMap<String, Vec<Reading>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, device: Device) {
        let mut devices = self.devices.write().await;
        devices.insert(device.device_id.clone(), device);
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn query(&self, device_id: &str, window: &Window) -> Result<Vec<Reading>, StoreError> {
        let readings = self.readings.read().await;
        let Some(partition) = readings.get(device_id) else {
            return Ok(Vec::new());
        };
        let from = partition.partition_point(|r| r.timestamp < window.start);
        let to = partition.partition_point(|r| r.timestamp < window.end);
        Ok(partition[from..to.max(from)].to_vec())
    }

    async fn latest(&self, device_id: &str) -> Result<Option<Reading>, StoreError> {
        let readings = self.readings.read().await;
        Ok(readings
            .get(device_id)
            .and_then(|partition| partition.last())
            .cloned())
    }

    async fn insert(&self, reading: &Reading) -> Result<(), StoreError> {
        let mut readings = self.readings.write().await;
        let partition = readings.entry(reading.device_id.clone()).or_default();
        let at = partition.partition_point(|r| r.timestamp <= reading.timestamp);
        partition.insert(at, reading.clone());
        Ok(())
    }
}

#[async_trait]
impl DeviceRegistry for MemoryStore {
    async fn device(&self, device_id: &str) -> Result<Option<Device>, StoreError> {
        Ok(self.devices.read().await.get(device_id).cloned())
    }

    async fn devices(&self) -> Result<Vec<Device>, StoreError> {
        Ok(self.devices.read().await.values().cloned().collect())
    }
}
