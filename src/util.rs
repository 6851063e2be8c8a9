//! Shared utility functions for fleet-billing

/// Milliseconds in one day.
pub const DAY_MS: i64 = 86_400_000;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Entitlement end for a term starting at `start_ms` and lasting
/// `duration_days` whole days.
pub fn end_date_for(start_ms: i64, duration_days: i32) -> i64 {
    start_ms + i64::from(duration_days) * DAY_MS
}

/// Whole days of entitlement left at `now_ms`.
///
/// A partial day counts as a full day; past-due terms clamp to zero.
/// Derived on every read, never persisted.
pub fn days_remaining(end_ms: i64, now_ms: i64) -> i64 {
    if now_ms >= end_ms {
        return 0;
    }
    (end_ms - now_ms + DAY_MS - 1) / DAY_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_date_math() {
        let start = 1_700_000_000_000;
        assert_eq!(end_date_for(start, 30), start + 30 * DAY_MS);
        assert_eq!(end_date_for(start, 1), start + DAY_MS);
        // end is always strictly after start for valid plan durations
        assert!(end_date_for(start, 1) > start);
    }

    #[test]
    fn test_days_remaining_counts_down_by_whole_days() {
        let start = 1_700_000_000_000;
        let end = end_date_for(start, 30);
        for k in 0..30 {
            assert_eq!(days_remaining(end, start + k * DAY_MS), 30 - k);
        }
    }

    #[test]
    fn test_days_remaining_zero_at_or_past_expiry() {
        let start = 1_700_000_000_000;
        let end = end_date_for(start, 30);
        assert_eq!(days_remaining(end, end), 0);
        assert_eq!(days_remaining(end, end + 1), 0);
        assert_eq!(days_remaining(end, end + 90 * DAY_MS), 0);
    }

    #[test]
    fn test_days_remaining_partial_day_rounds_up() {
        let end = 10 * DAY_MS;
        // one millisecond into the first day still leaves 10 whole-day credits minus the partial
        assert_eq!(days_remaining(end, 1), 10);
        assert_eq!(days_remaining(end, DAY_MS - 1), 10);
        assert_eq!(days_remaining(end, DAY_MS), 9);
        assert_eq!(days_remaining(end, end - 1), 1);
    }
}
