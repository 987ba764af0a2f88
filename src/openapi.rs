use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes;
use crate::services::device_status::{DeviceStatus, Liveness};
use crate::services::readings::{Field, RangeToken, Reading, Window};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Field Telemetry API",
        description = "Raw readings, hour-of-day profiles and device liveness for field sensors."
    ),
    paths(
        routes::health::healthz_handler,
        routes::readings::list_readings,
        routes::readings::create_reading,
        routes::readings::hourly_readings,
        routes::readings::latest_reading,
        routes::devices::list_device_status,
        routes::devices::device_status,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::readings::HourlySlotResponse,
        routes::readings::LatestReadingRequest,
        routes::readings::ReadingCreateRequest,
        routes::devices::DeviceStatusResponse,
        Reading,
        Field,
        RangeToken,
        Window,
        DeviceStatus,
        Liveness,
    )),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "readings", description = "Sensor reading queries and ingest"),
        (name = "devices", description = "Device online/offline status")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or(serde_json::Value::Null)
}

async fn openapi_handler() -> Json<serde_json::Value> {
    Json(openapi_json())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}
