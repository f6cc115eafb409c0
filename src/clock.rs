// Time source for timestamps and day-granularity comparisons

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use std::sync::{Arc, Mutex};

pub use mockable::{Clock, DefaultClock};

/// Calendar day an instant falls on in the local timezone
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

/// Today's local calendar day according to `clock`
pub fn local_today<C: Clock + ?Sized>(clock: &C) -> NaiveDate {
    clock.local().date_naive()
}

/// Manually driven clock.
///
/// Clones share the same instant, so a test can keep a handle and advance
/// time after handing the clock to a store.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Clock set to local midday on the given day
    pub fn at_noon(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        let instant = Local
            .from_local_datetime(&noon)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| noon.and_utc());
        Self::new(instant)
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }

    pub fn today(&self) -> NaiveDate {
        local_today(self)
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::at_noon(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        let handle = clock.clone();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());

        handle.advance(TimeDelta::hours(13));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());

        let later = clock.utc() + TimeDelta::days(2);
        handle.set(later);
        assert_eq!(clock.utc(), later);
    }

    #[test]
    fn test_local_date_agrees_with_clock() {
        let clock = ManualClock::at_noon(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(local_date(clock.utc()), clock.today());
        assert_eq!(clock.local().date_naive(), clock.today());
    }

    #[test]
    fn test_default_clock_today_matches_local_date() {
        let today = local_today(&DefaultClock);
        let local = Local::now().date_naive();
        // Tolerate a midnight rollover between the two calls
        assert!(today == local || today.succ_opt() == Some(local));
    }
}
