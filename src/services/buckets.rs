use chrono::TimeZone;

use super::readings::{Field, Reading};
use crate::time;

pub const HOURS_PER_DAY: usize = 24;

/// Accumulated statistics for one hour-of-day slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bucket {
    pub hour_index: u8,
    pub count: u64,
    pub sum: f64,
}

impl Bucket {
    fn empty(hour_index: u8) -> Self {
        Self {
            hour_index,
            count: 0,
            sum: 0.0,
        }
    }

    /// `None` means "no data"; an empty bucket never reports zero.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

pub type HourProfile = [Bucket; HOURS_PER_DAY];

pub fn empty_profile() -> HourProfile {
    std::array::from_fn(|hour| Bucket::empty(hour as u8))
}

/// Folds readings into an hour-of-day profile for `field`.
///
/// Readings from different calendar days that share a local hour land in the
/// same bucket. Readings without a finite, in-range value for `field` are
/// skipped.
pub fn bucketize<Tz: TimeZone>(readings: &[Reading], field: Field, tz: &Tz) -> HourProfile {
    let mut profile = empty_profile();
    let mut skipped = 0usize;

    for reading in readings {
        let Some(value) = reading.usable_value(field) else {
            skipped += 1;
            continue;
        };
        let hour = time::local_hour(tz, reading.timestamp) as usize;
        let bucket = &mut profile[hour];
        bucket.count += 1;
        bucket.sum += value;
    }

    if skipped > 0 {
        tracing::debug!(
            field = %field,
            skipped,
            total = readings.len(),
            "readings without a usable value were left out of the profile"
        );
    }

    profile
}
