//! Reading store and device registry seams. The aggregation core only sees
//! these traits; Postgres backs them in production and the in-memory store
//! backs tests and local demos.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::services::readings::{Device, Reading, Window};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Readings for `device_id` inside `window`, ascending by timestamp.
    async fn query(&self, device_id: &str, window: &Window) -> Result<Vec<Reading>, StoreError>;

    async fn latest(&self, device_id: &str) -> Result<Option<Reading>, StoreError>;

    async fn insert(&self, reading: &Reading) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn device(&self, device_id: &str) -> Result<Option<Device>, StoreError>;

    async fn devices(&self) -> Result<Vec<Device>, StoreError>;
}
