use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};

/// Fires at the top of every UTC hour divisible by `every_hours`, the same
/// instants as the cron expression `0 */N * * *`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    every_hours: u32,
}

impl Schedule {
    pub fn every_hours(every_hours: u32) -> Self {
        Schedule {
            every_hours: every_hours.clamp(1, 24),
        }
    }

    /// First firing time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour_start = now
            .duration_trunc(Duration::hours(1))
            .unwrap_or(now);
        let mut candidate = hour_start + Duration::hours(1);
        // Hours wrap at midnight, so at most 24 steps
        for _ in 0..24 {
            if candidate.hour() % self.every_hours == 0 {
                return candidate;
            }
            candidate += Duration::hours(1);
        }
        candidate
    }

    /// Time to wait from `now` until the next firing.
    pub fn delay_from(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_six_hourly_schedule() {
        let schedule = Schedule::every_hours(6);
        assert_eq!(schedule.next_after(at(0, 0, 0)), at(6, 0, 0));
        assert_eq!(schedule.next_after(at(5, 59, 59)), at(6, 0, 0));
        assert_eq!(schedule.next_after(at(6, 0, 0)), at(12, 0, 0));
        assert_eq!(
            schedule.next_after(at(19, 30, 0)),
            Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_hourly_schedule() {
        let schedule = Schedule::every_hours(1);
        assert_eq!(schedule.next_after(at(10, 15, 0)), at(11, 0, 0));
        assert_eq!(
            schedule.delay_from(at(10, 59, 30)),
            std::time::Duration::from_secs(30)
        );
    }

    #[test]
    fn test_uneven_interval_restarts_at_midnight() {
        let schedule = Schedule::every_hours(5);
        assert_eq!(schedule.next_after(at(20, 1, 0)), Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
        assert_eq!(schedule.next_after(at(0, 1, 0)), at(5, 0, 0));
    }

    #[test]
    fn test_daily_schedule() {
        let schedule = Schedule::every_hours(24);
        assert_eq!(schedule.next_after(at(0, 0, 0)), Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap());
    }
}
