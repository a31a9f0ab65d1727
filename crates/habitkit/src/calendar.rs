// crates/habitkit/src/calendar.rs
// Calendar-day handling and the injectable clock

use crate::error::{HabitError, Result};
use chrono::{Datelike, Local, NaiveDate, Utc};
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

/// Storage format for calendar days. Zero-padded so lexicographic order
/// matches chronological order.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` day, rejecting anything that is not zero-padded.
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    let day = NaiveDate::parse_from_str(s, DAY_FORMAT)
        .map_err(|_| HabitError::InvalidDate(s.to_string()))?;
    // chrono accepts "2024-1-5"; stored keys must compare lexicographically
    if format_day(day) != s {
        return Err(HabitError::InvalidDate(s.to_string()));
    }
    Ok(day)
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Source of "today" and "now" for the engine.
///
/// The streak rescan after an undo is anchored at today, so tests need to
/// control it.
pub trait Clock: Send + Sync {
    /// The current local calendar day.
    fn today(&self) -> NaiveDate;

    /// Wall-clock time in epoch milliseconds.
    fn now_millis(&self) -> i64;
}

/// Clock backed by the system time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock pinned to a settable day. `now_millis` ticks forward by one
/// millisecond per call so ordering by timestamp stays stable.
#[derive(Debug)]
pub struct FixedClock {
    days_from_ce: AtomicI32,
    tick: AtomicI64,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            days_from_ce: AtomicI32::new(today.num_days_from_ce()),
            tick: AtomicI64::new(0),
        }
    }

    /// Build from a `YYYY-MM-DD` string.
    pub fn on(day: &str) -> Result<Self> {
        Ok(Self::new(parse_day(day)?))
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.days_from_ce
            .store(today.num_days_from_ce(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i32) {
        self.days_from_ce.fetch_add(days, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        let days = self.days_from_ce.load(Ordering::SeqCst);
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(NaiveDate::MIN)
    }

    fn now_millis(&self) -> i64 {
        let noon = self
            .today()
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        noon + self.tick.fetch_add(1, Ordering::SeqCst)
    }
}
