use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::services::device_status::Liveness;
use crate::services::query::DeviceSnapshot;
use crate::services::readings::Reading;
use crate::state::AppState;

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct DeviceStatusResponse {
    device_id: String,
    name: Option<String>,
    check_interval_minutes: u32,
    is_online: bool,
    status: Liveness,
    last_reading_at: Option<DateTime<Utc>>,
    latest: Option<Reading>,
}

impl From<DeviceSnapshot> for DeviceStatusResponse {
    fn from(snapshot: DeviceSnapshot) -> Self {
        Self {
            device_id: snapshot.device.device_id,
            name: snapshot.device.name,
            check_interval_minutes: snapshot.device.check_interval_minutes,
            is_online: snapshot.status.is_online,
            status: snapshot.status.status,
            last_reading_at: snapshot.status.last_reading_at,
            latest: snapshot.latest,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/devices/status",
    tag = "devices",
    responses(
        (status = 200, description = "Liveness for every registered device", body = Vec<DeviceStatusResponse>),
        (status = 503, description = "Reading store unavailable")
    )
)]
pub(crate) async fn list_device_status(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DeviceStatusResponse>>> {
    let snapshots = state.queries.fleet_snapshot(state.now()).await?;
    Ok(Json(
        snapshots.into_iter().map(DeviceStatusResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/devices/{device_id}/status",
    tag = "devices",
    params(("device_id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "Device liveness", body = DeviceStatusResponse),
        (status = 404, description = "Unknown device")
    )
)]
pub(crate) async fn device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<DeviceStatusResponse>> {
    let snapshot = state
        .queries
        .device_snapshot(device_id.trim(), state.now())
        .await?;
    Ok(Json(snapshot.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/devices/status", get(list_device_status))
        .route("/devices/{device_id}/status", get(device_status))
}
