//! Period windows for aggregation.
//!
//! A window is an inclusive lower bound with no upper bound. Weeks start on
//! Sunday.

use chrono::{Datelike, Local, NaiveDate};
use shared::Period;

/// Source of "today" in the user's local calendar
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// System clock in local time
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a date, for tests and reproducible summaries
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub trait PeriodWindow {
    /// First calendar date inside the window that contains `today`
    fn window_start(&self, today: NaiveDate) -> NaiveDate;
}

impl PeriodWindow for Period {
    fn window_start(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => today,
            Period::Week => {
                let days_since_sunday = today.weekday().num_days_from_sunday() as u64;
                today - chrono::Days::new(days_since_sunday)
            }
            Period::Month => today.with_day(1).unwrap_or(today),
            Period::Year => today.with_ordinal(1).unwrap_or(today),
        }
    }
}
