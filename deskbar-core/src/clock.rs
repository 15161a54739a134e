//! Wall-clock access
//!
//! Services never call `Local::now()` directly so scheduling and day
//! rollover can be tested with a controllable clock.

use std::cell::Cell;

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Source of the local wall-clock time
pub trait Clock {
    /// Current local date and time
    fn now(&self) -> NaiveDateTime;

    /// Current local date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current Unix timestamp in seconds
    fn unix_timestamp(&self) -> i64 {
        self.now()
            .and_local_timezone(Local)
            .earliest()
            .map_or_else(|| self.now().and_utc().timestamp(), |t| t.timestamp())
    }
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn unix_timestamp(&self) -> i64 {
        Local::now().timestamp()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<NaiveDateTime>,
}

impl ManualClock {
    /// Starts at `now`
    #[must_use]
    pub const fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    /// Jumps to an absolute time
    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    /// Moves forward by `delta`
    pub fn advance(&self, delta: chrono::Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}
