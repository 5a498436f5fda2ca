//! Alarm matching.
//!
//! [`find_due`] is a pure function over local civil time. It does not
//! remember what already fired; [`MinuteGate`] provides the
//! at-most-once-per-minute guarantee in front of it. The gate counts UTC
//! minutes, so a time zone change or a DST fall-back never stalls it.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::{AlarmSchedule, Recurrence};

/// Drop seconds and sub-seconds.
pub fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Whether a single alarm fires at the minute `at`.
pub fn is_due(alarm: &AlarmSchedule, at: &NaiveDateTime) -> bool {
    if !alarm.enabled || !alarm.fire_time.matches(at) {
        return false;
    }
    match &alarm.recurrence {
        Recurrence::SpecificDate(date) => *date == at.date(),
        Recurrence::Weekly(days) if !days.is_empty() => {
            let weekday = at.weekday().num_days_from_sunday() as u8;
            days.contains(&weekday)
        }
        // No date and no weekdays: matches every day at its time.
        Recurrence::Weekly(_) | Recurrence::Once => true,
    }
}

/// Every alarm that fires at `at`, in list order.
///
/// Alarms sharing a time are all returned. After a `SpecificDate` match the
/// caller must disable that alarm so the date cannot fire again.
pub fn find_due(alarms: &[AlarmSchedule], at: NaiveDateTime) -> Vec<&AlarmSchedule> {
    let at = truncate_to_minute(at);
    alarms.iter().filter(|a| is_due(a, &at)).collect()
}

/// Admits each minute at most once.
///
/// Polls arrive many times a minute; only the first poll of a new minute
/// gets to evaluate alarms. A UTC minute at or before the last admitted one
/// (a repeat, or the system clock stepping backwards) is refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteGate {
    last: Option<DateTime<Utc>>,
}

impl MinuteGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_admitted(&self) -> Option<DateTime<Utc>> {
        self.last
    }

    /// Returns the truncated minute if it has not been evaluated yet.
    pub fn admit(&mut self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let minute = truncate_to_minute(at.naive_utc()).and_utc();
        match self.last {
            Some(last) if minute <= last => None,
            _ => {
                self.last = Some(minute);
                Some(minute)
            }
        }
    }
}
