use crate::error::TrackerError;
use chrono::{DateTime, Duration, Local, NaiveDate};
use std::collections::BTreeMap;

/// Elapsed-time accumulator attached to a ticket or todo item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeAccount {
    /// Total elapsed time accumulated
    elapsed: Duration,
    /// Elapsed time per local calendar day
    daily: BTreeMap<NaiveDate, Duration>,
    /// When the current interval started (not persisted)
    running_since: Option<DateTime<Local>>,
}

impl TimeAccount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a stopped account from persisted totals
    pub fn restore(elapsed: Duration, daily: BTreeMap<NaiveDate, Duration>) -> Self {
        Self {
            elapsed,
            daily,
            running_since: None,
        }
    }

    /// Start accruing from `now`
    pub fn start(&mut self, now: DateTime<Local>) -> Result<(), TrackerError> {
        if self.running_since.is_some() {
            return Err(TrackerError::AlreadyRunning);
        }
        self.running_since = Some(now);
        Ok(())
    }

    /// Stop accruing and book the interval under the day it started.
    /// Returns the booked interval, or `None` when the account was not running.
    pub fn stop(&mut self, now: DateTime<Local>) -> Option<Duration> {
        let started = self.running_since.take()?;
        let delta = interval(started, now);
        self.elapsed = self.elapsed + delta;
        let day = self.daily.entry(started.date_naive()).or_insert_with(Duration::zero);
        *day = *day + delta;
        Some(delta)
    }

    /// Book the in-flight interval and keep running from `now`
    pub fn checkpoint(&mut self, now: DateTime<Local>) {
        self.rebase(now, now);
    }

    /// Book the in-flight interval up to `until`, then keep running from `now`.
    /// Used when the clock has jumped back past `until`.
    pub fn rebase(&mut self, until: DateTime<Local>, now: DateTime<Local>) {
        if self.stop(until).is_some() {
            self.running_since = Some(now);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    #[cfg(test)]
    pub fn running_since(&self) -> Option<DateTime<Local>> {
        self.running_since
    }

    /// Time accrued by the current interval so far
    pub fn in_flight(&self, now: DateTime<Local>) -> Duration {
        self.running_since
            .map(|started| interval(started, now))
            .unwrap_or_else(Duration::zero)
    }

    /// Booked total plus the in-flight interval
    pub fn elapsed_now(&self, now: DateTime<Local>) -> Duration {
        self.elapsed + self.in_flight(now)
    }

    /// Booked total, excluding any in-flight interval
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Booked time for one date
    pub fn elapsed_on(&self, date: NaiveDate) -> Duration {
        self.daily.get(&date).copied().unwrap_or_else(Duration::zero)
    }

    /// Booked time for one date, plus the in-flight interval if it started on that date
    pub fn elapsed_on_now(&self, date: NaiveDate, now: DateTime<Local>) -> Duration {
        let booked = self.elapsed_on(date);
        match self.running_since {
            Some(started) if started.date_naive() == date => booked + interval(started, now),
            _ => booked,
        }
    }

    #[cfg(test)]
    pub fn daily(&self) -> &BTreeMap<NaiveDate, Duration> {
        &self.daily
    }

    /// Totals as if the account were stopped at `now`, without stopping it
    pub fn snapshot(&self, now: DateTime<Local>) -> (Duration, BTreeMap<NaiveDate, Duration>) {
        let mut daily = self.daily.clone();
        if let Some(started) = self.running_since {
            let day = daily.entry(started.date_naive()).or_insert_with(Duration::zero);
            *day = *day + interval(started, now);
        }
        (self.elapsed_now(now), daily)
    }

    /// Ascending (date, duration) pairs including the in-flight interval
    pub fn daily_breakdown(&self, now: DateTime<Local>) -> Vec<(NaiveDate, Duration)> {
        self.snapshot(now).1.into_iter().collect()
    }
}

/// Length of `[started, now]`, clamped at zero if the wall clock went backwards
fn interval(started: DateTime<Local>, now: DateTime<Local>) -> Duration {
    let delta = now.signed_duration_since(started);
    if delta < Duration::zero() {
        log::warn!("Clock moved backwards by {}s; interval counted as zero", -delta.num_seconds());
        return Duration::zero();
    }
    delta
}

/// Accumulated work time for the current work day
#[derive(Debug, Clone, PartialEq)]
pub struct WorkDay {
    date: NaiveDate,
    elapsed: Duration,
    running_since: Option<DateTime<Local>>,
}

impl WorkDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            elapsed: Duration::zero(),
            running_since: None,
        }
    }

    /// Restore a persisted accumulator; a stale date starts a new day at zero
    pub fn restore(date: NaiveDate, elapsed: Duration, today: NaiveDate) -> Self {
        if date == today {
            Self {
                date,
                elapsed,
                running_since: None,
            }
        } else {
            Self::new(today)
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn start(&mut self, now: DateTime<Local>) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn stop(&mut self, now: DateTime<Local>) {
        if let Some(started) = self.running_since.take() {
            self.elapsed = self.elapsed + interval(started, now);
        }
    }

    /// Book the in-flight interval up to `until`, then keep running from `now`
    pub fn rebase(&mut self, until: DateTime<Local>, now: DateTime<Local>) {
        if self.running_since.is_some() {
            self.stop(until);
            self.running_since = Some(now);
        }
    }

    pub fn elapsed_now(&self, now: DateTime<Local>) -> Duration {
        self.elapsed
            + self
                .running_since
                .map(|started| interval(started, now))
                .unwrap_or_else(Duration::zero)
    }

    /// Start a new day at zero if `now` falls on a later date.
    /// Returns the finished date on rollover.
    pub fn roll(&mut self, now: DateTime<Local>) -> Option<NaiveDate> {
        let today = now.date_naive();
        if today <= self.date {
            return None;
        }
        let finished = self.date;
        let was_running = self.running_since.is_some();
        *self = Self::new(today);
        if was_running {
            self.running_since = Some(now);
        }
        Some(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::local;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_account_new_is_stopped() {
        let account = TimeAccount::new();
        assert!(!account.is_running());
        assert_eq!(account.elapsed(), Duration::zero());
        assert!(account.daily().is_empty());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut account = TimeAccount::new();
        let t0 = local(2024, 5, 2, 10, 0, 0);
        account.start(t0).unwrap();
        assert!(matches!(account.start(t0), Err(TrackerError::AlreadyRunning)));
        assert_eq!(account.running_since(), Some(t0));
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut account = TimeAccount::new();
        assert_eq!(account.stop(local(2024, 5, 2, 10, 0, 0)), None);
        assert_eq!(account, TimeAccount::new());
    }

    #[test]
    fn test_stop_books_interval() {
        let mut account = TimeAccount::new();
        account.start(local(2024, 5, 2, 10, 0, 0)).unwrap();
        let booked = account.stop(local(2024, 5, 2, 10, 25, 0));
        assert_eq!(booked, Some(Duration::minutes(25)));
        assert_eq!(account.elapsed(), Duration::minutes(25));
        assert_eq!(account.elapsed_on(date(2024, 5, 2)), Duration::minutes(25));
        assert!(!account.is_running());
    }

    #[test]
    fn test_interval_across_midnight_goes_to_start_day() {
        let mut account = TimeAccount::new();
        account.start(local(2024, 1, 1, 23, 59, 50)).unwrap();
        account.stop(local(2024, 1, 2, 0, 0, 10));
        assert_eq!(account.elapsed_on(date(2024, 1, 1)), Duration::seconds(20));
        assert_eq!(account.elapsed_on(date(2024, 1, 2)), Duration::zero());
        assert_eq!(account.elapsed(), Duration::seconds(20));
    }

    #[test]
    fn test_daily_sum_matches_total() {
        let mut account = TimeAccount::new();
        let intervals = [
            (local(2024, 3, 4, 9, 0, 0), local(2024, 3, 4, 9, 45, 12)),
            (local(2024, 3, 4, 13, 0, 0), local(2024, 3, 4, 13, 0, 1)),
            (local(2024, 3, 5, 8, 30, 0), local(2024, 3, 5, 11, 2, 0)),
            (local(2024, 3, 7, 23, 0, 0), local(2024, 3, 8, 1, 0, 0)),
        ];
        for (start, stop) in intervals {
            account.start(start).unwrap();
            account.stop(stop);
        }
        let sum = account
            .daily()
            .values()
            .fold(Duration::zero(), |acc, d| acc + *d);
        assert_eq!(sum, account.elapsed());
        assert_eq!(account.daily().len(), 3);
    }

    #[test]
    fn test_elapsed_now_does_not_mutate() {
        let mut account = TimeAccount::new();
        account.start(local(2024, 5, 2, 10, 0, 0)).unwrap();
        let before = account.clone();
        let now = local(2024, 5, 2, 10, 0, 42);
        assert_eq!(account.elapsed_now(now), Duration::seconds(42));
        assert_eq!(account.elapsed_on_now(date(2024, 5, 2), now), Duration::seconds(42));
        assert_eq!(account.elapsed_on(date(2024, 5, 2)), Duration::zero());
        assert_eq!(account, before);
    }

    #[test]
    fn test_snapshot_includes_in_flight() {
        let mut account = TimeAccount::restore(
            Duration::minutes(10),
            BTreeMap::from([(date(2024, 5, 1), Duration::minutes(10))]),
        );
        account.start(local(2024, 5, 2, 10, 0, 0)).unwrap();
        let (total, daily) = account.snapshot(local(2024, 5, 2, 10, 5, 0));
        assert_eq!(total, Duration::minutes(15));
        assert_eq!(daily.get(&date(2024, 5, 2)), Some(&Duration::minutes(5)));
        assert!(account.is_running());
        assert_eq!(account.elapsed(), Duration::minutes(10));
    }

    #[test]
    fn test_checkpoint_keeps_running() {
        let mut account = TimeAccount::new();
        account.start(local(2024, 1, 1, 23, 59, 0)).unwrap();
        account.checkpoint(local(2024, 1, 2, 0, 0, 1));
        assert!(account.is_running());
        account.stop(local(2024, 1, 2, 0, 1, 1));
        assert_eq!(account.elapsed_on(date(2024, 1, 1)), Duration::seconds(61));
        assert_eq!(account.elapsed_on(date(2024, 1, 2)), Duration::seconds(60));
    }

    #[test]
    fn test_backwards_clock_counts_zero() {
        let mut account = TimeAccount::new();
        account.start(local(2024, 5, 2, 10, 0, 0)).unwrap();
        account.stop(local(2024, 5, 2, 9, 0, 0));
        assert_eq!(account.elapsed(), Duration::zero());
    }

    #[test]
    fn test_work_day_accrues_and_rolls() {
        let mut day = WorkDay::new(date(2024, 1, 1));
        day.start(local(2024, 1, 1, 23, 0, 0));
        assert_eq!(day.elapsed_now(local(2024, 1, 1, 23, 30, 0)), Duration::minutes(30));

        let finished = day.roll(local(2024, 1, 2, 0, 0, 5));
        assert_eq!(finished, Some(date(2024, 1, 1)));
        assert_eq!(day.date(), date(2024, 1, 2));
        assert!(day.is_running());
        assert_eq!(day.elapsed_now(local(2024, 1, 2, 0, 1, 5)), Duration::minutes(1));
        assert_eq!(day.roll(local(2024, 1, 2, 9, 0, 0)), None);
    }

    #[test]
    fn test_work_day_ignores_an_earlier_date() {
        let mut day = WorkDay::new(date(2024, 1, 2));
        day.start(local(2024, 1, 2, 0, 0, 5));

        assert_eq!(day.roll(local(2024, 1, 1, 23, 59, 55)), None);
        assert_eq!(day.date(), date(2024, 1, 2));
        assert!(day.is_running());
        assert_eq!(day.elapsed_now(local(2024, 1, 2, 0, 30, 5)), Duration::minutes(30));
    }

    #[test]
    fn test_rebase_books_up_to_the_last_known_time() {
        let mut account = TimeAccount::new();
        account.start(local(2024, 1, 2, 0, 0, 5)).unwrap();
        account.rebase(local(2024, 1, 2, 0, 30, 5), local(2024, 1, 1, 23, 59, 55));
        assert!(account.is_running());
        assert_eq!(account.elapsed_on(date(2024, 1, 2)), Duration::minutes(30));
        assert_eq!(
            account.elapsed_now(local(2024, 1, 2, 0, 0, 5)),
            Duration::minutes(30) + Duration::seconds(10)
        );

        let mut day = WorkDay::new(date(2024, 1, 2));
        day.start(local(2024, 1, 2, 0, 0, 5));
        day.rebase(local(2024, 1, 2, 0, 30, 5), local(2024, 1, 1, 23, 59, 55));
        assert_eq!(day.elapsed_now(local(2024, 1, 1, 23, 59, 55)), Duration::minutes(30));

        let mut stopped = WorkDay::new(date(2024, 1, 2));
        stopped.rebase(local(2024, 1, 2, 0, 30, 5), local(2024, 1, 1, 23, 59, 55));
        assert!(!stopped.is_running());
    }

    #[test]
    fn test_work_day_restore_resets_stale_date() {
        let stale = WorkDay::restore(date(2024, 1, 1), Duration::hours(3), date(2024, 1, 2));
        assert_eq!(stale, WorkDay::new(date(2024, 1, 2)));

        let same = WorkDay::restore(date(2024, 1, 2), Duration::hours(3), date(2024, 1, 2));
        assert_eq!(same.elapsed_now(local(2024, 1, 2, 12, 0, 0)), Duration::hours(3));
    }
}
