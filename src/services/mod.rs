//! Aggregation core: window resolution, hour-of-day bucketing, rolling-clock
//! rotation and device liveness, composed by [`query::TelemetryQueries`].

pub mod buckets;
pub mod device_status;
pub mod query;
pub mod readings;
pub mod rotation;
pub mod window;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("reading store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}
