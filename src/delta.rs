use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::{Platform, PlatformCounts};

/// One participant's persisted record for one calendar date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub totals: PlatformCounts,
    pub deltas: PlatformCounts,
    pub scraped_at: DateTime<Utc>,
}

impl DailySnapshot {
    /// Sum of the five deltas; drives the achievement tier.
    pub fn total_today(&self) -> u32 {
        self.deltas.sum()
    }
}

/// `max(0, today - yesterday)` per platform.
pub fn deltas(today: &PlatformCounts, yesterday: &PlatformCounts) -> PlatformCounts {
    let mut out = PlatformCounts::ZERO;
    for p in Platform::ALL {
        out[p] = today[p].saturating_sub(yesterday[p]);
    }
    out
}

/// Builds today's snapshot; a missing `yesterday` is an all-zero baseline.
pub fn compute_daily_snapshot(
    today: PlatformCounts,
    yesterday: Option<&DailySnapshot>,
    date: NaiveDate,
    scraped_at: DateTime<Utc>,
) -> DailySnapshot {
    let baseline = yesterday.map_or(PlatformCounts::ZERO, |y| y.totals);
    DailySnapshot {
        date,
        totals: today,
        deltas: deltas(&today, &baseline),
        scraped_at,
    }
}

#[inline]
pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn snapshot(totals: [u32; 5]) -> DailySnapshot {
        DailySnapshot {
            date: day(1),
            totals: PlatformCounts(totals),
            deltas: PlatformCounts::ZERO,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn delta_never_negative() {
        let y = snapshot([12, 50, 3, 9, 4]);
        let s = compute_daily_snapshot(PlatformCounts([8, 53, 3, 0, 6]), Some(&y), day(2), Utc::now());
        assert_eq!(s.deltas, PlatformCounts([0, 3, 0, 0, 2]));
        assert_eq!(s.total_today(), 5);
        assert_eq!(s.totals, PlatformCounts([8, 53, 3, 0, 6]));
    }

    #[test]
    fn missing_baseline_means_deltas_equal_totals() {
        let today = PlatformCounts([5, 3, 0, 2, 1]);
        let s = compute_daily_snapshot(today, None, day(2), Utc::now());
        assert_eq!(s.deltas, today);
        assert_eq!(s.total_today(), 11);
    }

    #[test]
    fn previous_day_crosses_month() {
        assert_eq!(previous_day(day(1)), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }
}
