use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use chrono_tz::Tz;

use super::readings::{RangeToken, Window};
use super::QueryError;
use crate::time;

/// What to do with a range token that is not one of the known names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownTokenPolicy {
    /// Resolve as `month`, the dashboard's historical default.
    FallbackToMonth,
    Reject,
}

/// Turns range tokens into concrete `[start, end)` windows anchored at `now`.
///
/// Day boundaries and calendar arithmetic are evaluated in the configured
/// local timezone.
#[derive(Debug, Clone)]
pub struct WindowResolver {
    tz: Tz,
    unknown_tokens: UnknownTokenPolicy,
    max_custom_span: Option<Duration>,
}

impl WindowResolver {
    pub fn new(tz: Tz, unknown_tokens: UnknownTokenPolicy) -> Self {
        Self {
            tz,
            unknown_tokens,
            max_custom_span: None,
        }
    }

    pub fn with_max_custom_span(mut self, span: Duration) -> Self {
        self.max_custom_span = Some(span);
        self
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    pub fn resolve(
        &self,
        token: RangeToken,
        now: DateTime<Utc>,
        custom: Option<Window>,
    ) -> Result<Window, QueryError> {
        match token {
            RangeToken::Day => Window::new(now - Duration::hours(24), now),
            RangeToken::Week => {
                let start = self.local_midnight_before(now, |today| {
                    today.checked_sub_signed(Duration::days(7))
                })?;
                Window::new(start.min(now), now)
            }
            RangeToken::Month => {
                let start = self.local_midnight_before(now, |today| {
                    today.checked_sub_months(Months::new(1))
                })?;
                Window::new(start.min(now), now)
            }
            RangeToken::Year => {
                let start = self.local_midnight_before(now, |today| {
                    today.checked_sub_months(Months::new(12))
                })?;
                Window::new(start.min(now), now)
            }
            RangeToken::Custom => {
                let window = custom.ok_or_else(|| {
                    QueryError::InvalidRange("custom range requires start and end".to_string())
                })?;
                let window = Window::new(window.start, window.end)?;
                if let Some(max_span) = self.max_custom_span {
                    if window.duration() > max_span {
                        return Err(QueryError::InvalidRange(format!(
                            "custom range exceeds {} days",
                            max_span.num_days()
                        )));
                    }
                }
                Ok(window)
            }
        }
    }

    /// Resolves a raw token string, applying the unknown-token policy.
    pub fn resolve_raw(
        &self,
        raw: &str,
        now: DateTime<Utc>,
        custom: Option<Window>,
    ) -> Result<Window, QueryError> {
        let token = match RangeToken::parse(raw) {
            Some(token) => token,
            None => match self.unknown_tokens {
                UnknownTokenPolicy::FallbackToMonth => {
                    tracing::warn!(token = %raw.trim(), "unknown range token; using month");
                    RangeToken::Month
                }
                UnknownTokenPolicy::Reject => {
                    return Err(QueryError::InvalidRange(format!(
                        "unknown range token '{}'",
                        raw.trim()
                    )))
                }
            },
        };
        self.resolve(token, now, custom)
    }

    fn local_midnight_before(
        &self,
        now: DateTime<Utc>,
        shift: impl FnOnce(NaiveDate) -> Option<NaiveDate>,
    ) -> Result<DateTime<Utc>, QueryError> {
        let today = time::local_date(&self.tz, now);
        shift(today)
            .and_then(|date| time::local_midnight(&self.tz, date))
            .ok_or_else(|| {
                QueryError::InvalidRange(format!("unable to resolve range start before {today}"))
            })
    }
}
