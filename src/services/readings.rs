use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::QueryError;

/// Largest absolute value accepted for any reading field. Sums of bounded
/// values stay finite for any realistic number of readings.
pub const MAX_READING_MAGNITUDE: f64 = 1.0e9;

pub fn is_usable_value(value: f64) -> bool {
    value.is_finite() && value.abs() <= MAX_READING_MAGNITUDE
}

/// One telemetry sample from a field device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Reading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl Reading {
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::SoilMoisture => self.soil_moisture,
            Field::Humidity => self.humidity,
            Field::Temperature => self.temperature,
        }
    }

    /// The value of `field` when it can take part in aggregation.
    pub fn usable_value(&self, field: Field) -> Option<f64> {
        self.value(field).filter(|value| is_usable_value(*value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SoilMoisture,
    Humidity,
    Temperature,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::SoilMoisture => "soil_moisture",
            Field::Humidity => "humidity",
            Field::Temperature => "temperature",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "soilmoisture" | "moisture" => Ok(Field::SoilMoisture),
            "humidity" => Ok(Field::Humidity),
            "temperature" | "temp" => Ok(Field::Temperature),
            _ => Err(format!(
                "unknown field '{}' (expected soil_moisture, humidity or temperature)",
                raw.trim()
            )),
        }
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::InvalidRange(format!(
                "start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RangeToken {
    Day,
    Week,
    Month,
    Year,
    Custom,
}

impl RangeToken {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" => Some(RangeToken::Day),
            "week" => Some(RangeToken::Week),
            "month" => Some(RangeToken::Month),
            "year" => Some(RangeToken::Year),
            "custom" => Some(RangeToken::Custom),
            _ => None,
        }
    }
}

/// Registry view of a device. The check interval is owned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Device {
    pub device_id: String,
    pub name: Option<String>,
    pub check_interval_minutes: u32,
}
