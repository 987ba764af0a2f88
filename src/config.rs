use anyhow::{Context, Result};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::window::{UnknownTokenPolicy, WindowResolver};

const DEFAULT_SETUP_CONFIG_PATH: &str = "/etc/field-telemetry/config.json";

pub(crate) fn setup_config_path() -> PathBuf {
    if let Some(path) = env_optional_string("TELEMETRY_SETUP_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    if let Some(state_dir) = env_optional_string("TELEMETRY_STATE_DIR") {
        return PathBuf::from(state_dir).join("config.json");
    }
    PathBuf::from(DEFAULT_SETUP_CONFIG_PATH)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SetupConfigOverrides {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    db_pool_size: Option<u32>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    strict_range_tokens: Option<bool>,
    #[serde(default)]
    default_check_interval_minutes: Option<u32>,
    #[serde(default)]
    max_window_days: Option<u32>,
    #[serde(default)]
    cors_allow_any_origin: Option<bool>,
}

fn load_setup_config_overrides(path: &std::path::Path) -> Option<SetupConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

/// Setup-file values only fill settings the environment left unset.
fn apply_setup_overrides(
    config: &mut TelemetryConfig,
    overrides: &SetupConfigOverrides,
    env_is_set: impl Fn(&str) -> bool,
) {
    if !env_is_set("TELEMETRY_DB_POOL_SIZE") {
        if let Some(value) = overrides.db_pool_size.filter(|v| *v != 0) {
            config.db_pool_size = value;
        }
    }
    if !env_is_set("TELEMETRY_TIMEZONE") {
        if let Some(raw) = overrides.timezone.as_deref() {
            match parse_timezone(raw) {
                Ok(tz) => config.timezone = tz,
                Err(err) => {
                    tracing::warn!(timezone = %raw, error = %err, "ignoring setup timezone")
                }
            }
        }
    }
    if !env_is_set("TELEMETRY_STRICT_RANGE_TOKENS") {
        if let Some(value) = overrides.strict_range_tokens {
            config.strict_range_tokens = value;
        }
    }
    if !env_is_set("TELEMETRY_DEFAULT_CHECK_INTERVAL_MINUTES") {
        if let Some(value) = overrides.default_check_interval_minutes {
            config.default_check_interval_minutes = value;
        }
    }
    if !env_is_set("TELEMETRY_MAX_WINDOW_DAYS") {
        if let Some(value) = overrides.max_window_days.filter(|v| *v != 0) {
            config.max_window_days = value;
        }
    }
    if !env_is_set("TELEMETRY_CORS_ALLOW_ANY_ORIGIN") {
        if let Some(value) = overrides.cors_allow_any_origin {
            config.cors_allow_any_origin = value;
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub database_url: String,
    pub db_pool_size: u32,
    pub db_acquire_timeout_seconds: u64,
    pub timezone: Tz,
    pub strict_range_tokens: bool,
    pub default_check_interval_minutes: u32,
    pub max_window_days: u32,
    pub cors_allow_any_origin: bool,
}

impl TelemetryConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let setup_overrides = load_setup_config_overrides(&setup_config_path());

        let database_url = env_optional_string("TELEMETRY_DATABASE_URL")
            .or_else(|| env_optional_string("DATABASE_URL"))
            .or_else(|| {
                setup_overrides
                    .as_ref()
                    .and_then(|ov| ov.database_url.as_deref())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(|value| value.to_string())
            })
            .context("TELEMETRY_DATABASE_URL or DATABASE_URL must be set (or present as database_url in the setup config)")?;

        let timezone = match env_optional_string("TELEMETRY_TIMEZONE") {
            Some(raw) => parse_timezone(&raw)?,
            None => Tz::UTC,
        };

        let mut config = Self {
            database_url,
            db_pool_size: env_u32("TELEMETRY_DB_POOL_SIZE", 10).clamp(1, 100),
            db_acquire_timeout_seconds: env_u64("TELEMETRY_DB_ACQUIRE_TIMEOUT_SECONDS", 8)
                .clamp(1, 120),
            timezone,
            strict_range_tokens: env_bool("TELEMETRY_STRICT_RANGE_TOKENS", false),
            default_check_interval_minutes: env_u32(
                "TELEMETRY_DEFAULT_CHECK_INTERVAL_MINUTES",
                5,
            ),
            max_window_days: env_u32("TELEMETRY_MAX_WINDOW_DAYS", 400).max(1),
            cors_allow_any_origin: env_bool("TELEMETRY_CORS_ALLOW_ANY_ORIGIN", true),
        };

        if let Some(overrides) = setup_overrides.as_ref() {
            apply_setup_overrides(&mut config, overrides, |key| {
                env_optional_string(key).is_some()
            });
        }

        Ok(config)
    }

    pub fn db_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_seconds)
    }

    pub fn unknown_token_policy(&self) -> UnknownTokenPolicy {
        if self.strict_range_tokens {
            UnknownTokenPolicy::Reject
        } else {
            UnknownTokenPolicy::FallbackToMonth
        }
    }

    pub fn window_resolver(&self) -> WindowResolver {
        WindowResolver::new(self.timezone, self.unknown_token_policy())
            .with_max_custom_span(chrono::Duration::days(i64::from(self.max_window_days)))
    }
}

pub(crate) fn parse_timezone(raw: &str) -> Result<Tz> {
    let trimmed = raw.trim();
    trimmed
        .parse::<Tz>()
        .map_err(|err| anyhow::anyhow!("invalid timezone '{trimmed}': {err}"))
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|value| value.trim().to_lowercase())
    {
        Some(value) if value == "1" || value == "true" || value == "yes" => true,
        Some(value) if value == "0" || value == "false" || value == "no" => false,
        _ => default,
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
