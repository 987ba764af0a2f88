use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Dashboard liveness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum Liveness {
    On,
    Off,
}

impl Liveness {
    pub fn is_online(self) -> bool {
        matches!(self, Liveness::On)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct DeviceStatus {
    pub device_id: String,
    pub is_online: bool,
    pub status: Liveness,
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// A device is `On` while its latest reading is no older than its check
/// interval. No reading at all means `Off`.
pub fn evaluate(
    check_interval_minutes: u32,
    last_reading_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Liveness {
    let Some(last) = last_reading_at else {
        return Liveness::Off;
    };
    let deadline = last + Duration::minutes(i64::from(check_interval_minutes));
    if deadline < now {
        Liveness::Off
    } else {
        Liveness::On
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).single().expect("now")
    }

    #[test]
    fn recent_reading_is_on() {
        let last = now() - Duration::minutes(4);
        assert_eq!(evaluate(5, Some(last), now()), Liveness::On);
    }

    #[test]
    fn stale_reading_is_off() {
        let last = now() - Duration::minutes(6);
        assert_eq!(evaluate(5, Some(last), now()), Liveness::Off);
    }

    #[test]
    fn exact_deadline_is_still_on() {
        let last = now() - Duration::minutes(5);
        assert_eq!(evaluate(5, Some(last), now()), Liveness::On);
    }

    #[test]
    fn no_reading_is_off() {
        assert_eq!(evaluate(5, None, now()), Liveness::Off);
        assert!(!evaluate(60, None, now()).is_online());
    }

    #[test]
    fn zero_interval_only_accepts_readings_at_now() {
        assert_eq!(evaluate(0, Some(now()), now()), Liveness::On);
        assert_eq!(
            evaluate(0, Some(now() - Duration::seconds(1)), now()),
            Liveness::Off
        );
    }
}
