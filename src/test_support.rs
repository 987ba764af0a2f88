use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::config::TelemetryConfig;
use crate::services::query::TelemetryQueries;
use crate::services::readings::Device;
use crate::state::AppState;
use crate::store::MemoryStore;

pub fn test_config() -> TelemetryConfig {
    TelemetryConfig {
        database_url: "postgresql://postgres@localhost/postgres".to_string(),
        db_pool_size: 1,
        db_acquire_timeout_seconds: 1,
        timezone: Tz::UTC,
        strict_range_tokens: false,
        default_check_interval_minutes: 5,
        max_window_days: 400,
        cors_allow_any_origin: true,
    }
}

/// Fixed evaluation instant used by route tests: 2026-10-16 14:20 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 14, 20, 0)
        .single()
        .expect("test now")
}

pub async fn test_state() -> (AppState, Arc<MemoryStore>) {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    store
        .register(Device {
            device_id: "field-7".to_string(),
            name: Some("North field".to_string()),
            check_interval_minutes: 5,
        })
        .await;

    let queries = TelemetryQueries::new(store.clone(), store.clone(), config.window_resolver());
    let state = AppState::new(queries).with_clock(Arc::new(test_now));
    (state, store)
}
