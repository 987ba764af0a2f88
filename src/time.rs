use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

const GAP_SEARCH_MINUTES: i64 = 180;
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Maps a wall-clock datetime in `tz` to a UTC instant.
///
/// Ambiguous local times (DST fall-back) take the earlier instant; local times
/// inside a DST gap move forward to the first valid local minute.
pub(crate) fn resolve_local_datetime<Tz: TimeZone>(
    tz: &Tz,
    naive: NaiveDateTime,
) -> Option<DateTime<Utc>>
where
    Tz::Offset: Send + Sync,
{
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(a, b) => {
            let (a, b) = (a.with_timezone(&Utc), b.with_timezone(&Utc));
            Some(a.min(b))
        }
        chrono::LocalResult::None => {
            let next = find_next_valid_local(tz, naive, GAP_SEARCH_MINUTES)?;
            tracing::debug!(
                local = %naive,
                resolved = %next.to_rfc3339(),
                "nonexistent local datetime moved to next valid local time"
            );
            Some(next.with_timezone(&Utc))
        }
    }
}

fn find_next_valid_local<Tz: TimeZone>(
    tz: &Tz,
    naive: NaiveDateTime,
    max_minutes: i64,
) -> Option<DateTime<Tz>>
where
    Tz::Offset: Send + Sync,
{
    for minutes in 0..=max_minutes {
        let candidate = naive + Duration::minutes(minutes);
        match tz.from_local_datetime(&candidate) {
            chrono::LocalResult::Single(dt) => return Some(dt),
            chrono::LocalResult::Ambiguous(a, b) => {
                return Some(if a.with_timezone(&Utc) <= b.with_timezone(&Utc) {
                    a
                } else {
                    b
                })
            }
            chrono::LocalResult::None => continue,
        }
    }
    None
}

/// UTC instant of local midnight starting `date` in `tz`.
pub(crate) fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>>
where
    Tz::Offset: Send + Sync,
{
    resolve_local_datetime(tz, date.and_hms_opt(0, 0, 0)?)
}

pub(crate) fn local_date<Tz: TimeZone>(tz: &Tz, ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Wall-clock hour (0..=23) of `ts` in `tz`.
pub(crate) fn local_hour<Tz: TimeZone>(tz: &Tz, ts: DateTime<Utc>) -> u32 {
    ts.with_timezone(tz).hour()
}

/// Parses an RFC3339 instant, or a naive `YYYY-MM-DD HH:MM[:SS]` / `YYYY-MM-DD`
/// value interpreted as wall-clock time in `tz`.
pub(crate) fn parse_timestamp<Tz: TimeZone>(raw: &str, tz: &Tz) -> Result<DateTime<Utc>, String>
where
    Tz::Offset: Send + Sync,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("timestamp must not be empty".to_string());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("invalid timestamp '{raw}'"))?;

    resolve_local_datetime(tz, naive)
        .ok_or_else(|| format!("unable to resolve local timestamp '{raw}'"))
}
