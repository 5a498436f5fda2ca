//! Clock sources.
//!
//! Every timing decision in the engine is derived from a [`Clock`]. Deadline
//! math uses the UTC instant; alarm matching uses the local civil time of
//! that same instant.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, Offset, Utc};

pub trait Clock {
    /// Current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;

    /// Local civil time of `at`, as shown on the wall.
    fn local(&self, at: DateTime<Utc>) -> NaiveDateTime;

    fn local_now(&self) -> NaiveDateTime {
        self.local(self.now())
    }
}

/// The host's real clock, using the system time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&Local).naive_local()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and simulations to model suspension as a jump of
/// arbitrary length.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    /// A manual clock whose local time equals UTC.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_offset(start, Utc.fix())
    }

    pub fn with_offset(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Cell::new(start),
            offset,
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.offset).naive_local()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        (**self).local(at)
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        (**self).local(at)
    }
}
