//! The recency window used to decide refresh eligibility.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default window: activity within the last 30 days counts as recent.
pub const DEFAULT_THRESHOLD_DAYS: u32 = 30;

/// A recency window measured in whole days.
///
/// A timestamp is *recent* when fewer than `days` whole days have elapsed
/// since it, which is the same as being strictly newer than [`cutoff`].
///
/// [`cutoff`]: ThresholdWindow::cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdWindow {
    days: u32,
}

impl ThresholdWindow {
    pub const fn days(days: u32) -> Self {
        ThresholdWindow { days }
    }

    pub fn as_days(&self) -> u32 {
        self.days
    }

    /// The instant `days` days before `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.days))
    }

    /// True if fewer than `days` whole days separate `timestamp` from `now`.
    ///
    /// For past timestamps this is `(now - timestamp).num_days() < days`.
    /// Future timestamps are always recent.
    pub fn is_recent(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - timestamp < Duration::days(i64::from(self.days))
    }
}

impl Default for ThresholdWindow {
    fn default() -> Self {
        Self::days(DEFAULT_THRESHOLD_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn two_days_ago_is_recent_for_thirty_days() {
        let window = ThresholdWindow::days(30);
        assert!(window.is_recent(now() - Duration::days(2), now()));
    }

    #[test]
    fn exactly_threshold_days_ago_is_not_recent() {
        let window = ThresholdWindow::days(30);
        assert!(!window.is_recent(now() - Duration::days(30), now()));
        assert!(window.is_recent(now() - Duration::days(30) + Duration::seconds(1), now()));
    }

    #[test]
    fn zero_day_window_only_accepts_future() {
        let window = ThresholdWindow::days(0);
        assert!(!window.is_recent(now(), now()));
        assert!(window.is_recent(now() + Duration::hours(1), now()));
    }

    proptest! {
        #[test]
        fn recent_iff_newer_than_cutoff(days in 0u32..400, age_secs in -86_400i64..40_000_000) {
            let window = ThresholdWindow::days(days);
            let ts = now() - Duration::seconds(age_secs);
            prop_assert_eq!(window.is_recent(ts, now()), ts > window.cutoff(now()));
        }
    }
}
