use chrono::{DateTime, TimeZone, Utc};

use super::buckets::{Bucket, HourProfile, HOURS_PER_DAY};
use crate::time;

/// A bucket paired with the clock hour it is presented under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedBucket {
    pub hour_label: u8,
    pub bucket: Bucket,
}

pub type RotatedProfile = [RotatedBucket; HOURS_PER_DAY];

/// Anchor for rolling 24h views: the hour after the current local hour.
pub fn anchor_hour<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> u8 {
    ((time::local_hour(tz, now) + 1) % HOURS_PER_DAY as u32) as u8
}

/// Relabels each bucket as `(index + anchor) mod 24`. Order and statistics
/// are left untouched.
pub fn rotate(profile: &HourProfile, anchor_hour: u8) -> RotatedProfile {
    std::array::from_fn(|index| RotatedBucket {
        hour_label: shift(index as u8, anchor_hour),
        bucket: profile[index],
    })
}

/// Applies a further rotation to an already rotated profile.
pub fn rerotate(rotated: &RotatedProfile, anchor_hour: u8) -> RotatedProfile {
    std::array::from_fn(|index| RotatedBucket {
        hour_label: shift(rotated[index].hour_label, anchor_hour),
        bucket: rotated[index].bucket,
    })
}

fn shift(label: u8, anchor_hour: u8) -> u8 {
    ((label as usize + anchor_hour as usize) % HOURS_PER_DAY) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::buckets::empty_profile;

    fn sample_profile() -> HourProfile {
        let mut profile = empty_profile();
        for (hour, bucket) in profile.iter_mut().enumerate() {
            bucket.count = hour as u64 + 1;
            bucket.sum = (hour * 10) as f64;
        }
        profile
    }

    #[test]
    fn anchor_zero_is_identity() {
        let profile = sample_profile();
        let rotated = rotate(&profile, 0);
        for (index, slot) in rotated.iter().enumerate() {
            assert_eq!(slot.hour_label as usize, index);
            assert_eq!(slot.bucket, profile[index]);
        }
    }

    #[test]
    fn relabels_from_anchor_and_wraps() {
        let profile = sample_profile();
        let rotated = rotate(&profile, 15);
        assert_eq!(rotated[0].hour_label, 15);
        assert_eq!(rotated[8].hour_label, 23);
        assert_eq!(rotated[9].hour_label, 0);
        assert_eq!(rotated[23].hour_label, 14);
    }

    #[test]
    fn statistics_are_never_touched() {
        let profile = sample_profile();
        let rotated = rotate(&profile, 7);
        let buckets: Vec<Bucket> = rotated.iter().map(|slot| slot.bucket).collect();
        assert_eq!(buckets, profile.to_vec());
    }

    #[test]
    fn labels_form_a_permutation() {
        let rotated = rotate(&sample_profile(), 11);
        let mut labels: Vec<u8> = rotated.iter().map(|slot| slot.hour_label).collect();
        labels.sort_unstable();
        assert_eq!(labels, (0..24).collect::<Vec<u8>>());
    }

    #[test]
    fn successive_rotations_compose() {
        let profile = sample_profile();
        for a in [0u8, 5, 17, 23] {
            for b in [0u8, 3, 19, 23] {
                let twice = rerotate(&rotate(&profile, a), b);
                let once = rotate(&profile, ((a as usize + b as usize) % 24) as u8);
                assert_eq!(twice, once, "a={a} b={b}");
            }
        }
    }

    #[test]
    fn anchor_is_hour_after_now() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 14, 5, 0).single().expect("now");
        assert_eq!(anchor_hour(now, &Utc), 15);

        let late = Utc.with_ymd_and_hms(2026, 10, 16, 23, 59, 0).single().expect("late");
        assert_eq!(anchor_hour(late, &Utc), 0);
    }
}
