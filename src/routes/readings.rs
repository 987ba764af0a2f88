use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use utoipa::openapi::schema::{ObjectBuilder, OneOfBuilder, Schema, SchemaType};
use utoipa::openapi::RefOr;

use crate::error::{AppError, AppResult};
use crate::services::query::Rotation;
use crate::services::readings::{
    is_usable_value, Field, RangeToken, Reading, Window, MAX_READING_MAGNITUDE,
};
use crate::services::rotation::RotatedBucket;
use crate::services::QueryError;
use crate::state::AppState;
use crate::time;

const DEFAULT_RANGE_TOKEN: &str = "month";
const NO_DATA: &str = "no data";

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct ReadingsQuery {
    #[serde(alias = "deviceId")]
    device_id: String,
    /// `day`, `week`, `month`, `year` or `custom`.
    range: Option<String>,
    /// RFC3339, or `YYYY-MM-DD HH:MM:SS` in the configured timezone.
    #[serde(alias = "startDate")]
    start: Option<String>,
    #[serde(alias = "endDate")]
    end: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct HourlyQuery {
    #[serde(alias = "deviceId")]
    device_id: String,
    /// `soil_moisture`, `humidity` or `temperature`.
    field: String,
    range: Option<String>,
    #[serde(alias = "startDate")]
    start: Option<String>,
    #[serde(alias = "endDate")]
    end: Option<String>,
    /// Rolling-clock labels ending at the current hour (default) or fixed
    /// midnight-to-midnight order.
    rotate: Option<bool>,
}

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub(crate) struct LatestReadingRequest {
    #[serde(alias = "deviceId")]
    device_id: String,
}

#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub(crate) struct ReadingCreateRequest {
    #[serde(alias = "deviceId")]
    device_id: String,
    timestamp: Option<String>,
    #[serde(default, alias = "soilMoisture")]
    soil_moisture: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    temperature: Option<f64>,
}

/// Mean for one slot, or the "no data" marker when the slot is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SlotValue {
    Mean(f64),
    NoData,
}

impl Serialize for SlotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SlotValue::Mean(value) if value.is_finite() => {
                serializer.serialize_f64(round_to_hundredths(*value))
            }
            SlotValue::Mean(_) | SlotValue::NoData => serializer.serialize_str(NO_DATA),
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    let scaled = value * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        value
    }
}

fn slot_value_schema() -> RefOr<Schema> {
    let mean = ObjectBuilder::new()
        .schema_type(SchemaType::Number)
        .description(Some("Mean rounded to two decimals"))
        .build();
    let no_data = ObjectBuilder::new()
        .schema_type(SchemaType::String)
        .enum_values(Some([NO_DATA]))
        .build();
    Schema::OneOf(
        OneOfBuilder::new()
            .item(Schema::Object(mean))
            .item(Schema::Object(no_data))
            .build(),
    )
    .into()
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub(crate) struct HourlySlotResponse {
    time_range: u8,
    /// Mean rounded to two decimals, or the string "no data".
    #[schema(schema_with = slot_value_schema)]
    value: SlotValue,
    samples: u64,
}

impl From<RotatedBucket> for HourlySlotResponse {
    fn from(slot: RotatedBucket) -> Self {
        Self {
            time_range: slot.hour_label,
            value: slot
                .bucket
                .mean()
                .map(SlotValue::Mean)
                .unwrap_or(SlotValue::NoData),
            samples: slot.bucket.count,
        }
    }
}

/// Turns request range parameters into a window. Explicit bounds win over a
/// range token; with neither, the month window applies.
pub(crate) fn resolve_request_window(
    state: &AppState,
    range: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<Window> {
    let resolver = state.queries.resolver();
    let tz = resolver.timezone();
    let start = start.map(str::trim).filter(|v| !v.is_empty());
    let end = end.map(str::trim).filter(|v| !v.is_empty());

    let window = match (start, end) {
        (Some(start), Some(end)) => {
            let start = time::parse_timestamp(start, tz).map_err(QueryError::InvalidRange)?;
            let end = time::parse_timestamp(end, tz).map_err(QueryError::InvalidRange)?;
            resolver.resolve(RangeToken::Custom, now, Some(Window { start, end }))?
        }
        (None, None) => {
            let token = range
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_RANGE_TOKEN);
            resolver.resolve_raw(token, now, None)?
        }
        _ => {
            return Err(QueryError::InvalidRange(
                "start and end must be provided together".to_string(),
            )
            .into())
        }
    };
    Ok(window)
}

#[utoipa::path(
    get,
    path = "/api/sensor-readings",
    tag = "readings",
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Readings in ascending timestamp order", body = Vec<Reading>),
        (status = 400, description = "Invalid range"),
        (status = 404, description = "Unknown device")
    )
)]
pub(crate) async fn list_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> AppResult<Json<Vec<Reading>>> {
    let now = state.now();
    let window = resolve_request_window(
        &state,
        query.range.as_deref(),
        query.start.as_deref(),
        query.end.as_deref(),
        now,
    )?;
    let readings = state
        .queries
        .raw_range(query.device_id.trim(), &window)
        .await?;
    Ok(Json(readings))
}

#[utoipa::path(
    get,
    path = "/api/sensor-readings/hourly",
    tag = "readings",
    params(HourlyQuery),
    responses(
        (status = 200, description = "24 hour-of-day slots", body = Vec<HourlySlotResponse>),
        (status = 400, description = "Invalid range or field"),
        (status = 404, description = "Unknown device")
    )
)]
pub(crate) async fn hourly_readings(
    State(state): State<AppState>,
    Query(query): Query<HourlyQuery>,
) -> AppResult<Json<Vec<HourlySlotResponse>>> {
    let field: Field = query.field.parse().map_err(AppError::bad_request)?;
    let now = state.now();
    let window = resolve_request_window(
        &state,
        query.range.as_deref(),
        query.start.as_deref(),
        query.end.as_deref(),
        now,
    )?;
    let rotation = if query.rotate.unwrap_or(true) {
        Rotation::Rolling
    } else {
        Rotation::Fixed
    };
    let profile = state
        .queries
        .hourly_average(query.device_id.trim(), &window, field, now, rotation)
        .await?;
    Ok(Json(profile.into_iter().map(HourlySlotResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/sensor-readings/latest",
    tag = "readings",
    request_body = LatestReadingRequest,
    responses(
        (status = 200, description = "Most recent reading", body = Reading),
        (status = 404, description = "Unknown device or no readings yet")
    )
)]
pub(crate) async fn latest_reading(
    State(state): State<AppState>,
    Json(request): Json<LatestReadingRequest>,
) -> AppResult<Json<Reading>> {
    let device_id = request.device_id.trim();
    let latest = state.queries.latest(device_id).await?;
    latest.map(Json).ok_or_else(|| {
        AppError::not_found(format!("No sensor readings found for device {device_id}"))
    })
}

#[utoipa::path(
    post,
    path = "/api/sensor-readings",
    tag = "readings",
    request_body = ReadingCreateRequest,
    responses(
        (status = 201, description = "Reading stored", body = Reading),
        (status = 400, description = "Invalid reading"),
        (status = 404, description = "Unknown device")
    )
)]
pub(crate) async fn create_reading(
    State(state): State<AppState>,
    Json(request): Json<ReadingCreateRequest>,
) -> AppResult<(StatusCode, Json<Reading>)> {
    let device_id = request.device_id.trim();
    if device_id.is_empty() {
        return Err(AppError::bad_request("device_id is required"));
    }
    let values = [request.soil_moisture, request.humidity, request.temperature];
    if values.iter().all(Option::is_none) {
        return Err(AppError::bad_request(
            "at least one of soil_moisture, humidity, temperature is required",
        ));
    }
    if values.iter().flatten().any(|value| !is_usable_value(*value)) {
        return Err(AppError::bad_request(format!(
            "reading values must be finite and within ±{MAX_READING_MAGNITUDE:e}"
        )));
    }

    let timestamp = match request.timestamp.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            time::parse_timestamp(raw, state.queries.resolver().timezone())
                .map_err(AppError::bad_request)?
        }
        _ => state.now(),
    };

    let reading = state
        .queries
        .record(Reading {
            device_id: device_id.to_string(),
            timestamp,
            soil_moisture: request.soil_moisture,
            humidity: request.humidity,
            temperature: request.temperature,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(reading)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sensor-readings", get(list_readings).post(create_reading))
        .route("/sensor-readings/hourly", get(hourly_readings))
        .route("/sensor-readings/latest", post(latest_reading))
}
