//! Daily focus statistics.
//!
//! One entry per calendar day, in chronological insertion order, capped to
//! the most recent [`FOCUS_HISTORY_DAYS`] days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const FOCUS_HISTORY_DAYS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFocusStat {
    pub date: NaiveDate,
    pub minutes: u32,
    pub sessions: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocusLedger {
    days: Vec<DailyFocusStat>,
}

impl FocusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn days(&self) -> &[DailyFocusStat] {
        &self.days
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DailyFocusStat> {
        self.days.iter().find(|d| d.date == date)
    }

    /// Add focus minutes and completed sessions to `date`.
    pub fn record(&mut self, date: NaiveDate, minutes: u32, sessions: u32) -> &DailyFocusStat {
        let idx = match self.days.iter().rposition(|d| d.date == date) {
            Some(idx) => idx,
            None => {
                self.days.push(DailyFocusStat {
                    date,
                    minutes: 0,
                    sessions: 0,
                });
                if self.days.len() > FOCUS_HISTORY_DAYS {
                    let excess = self.days.len() - FOCUS_HISTORY_DAYS;
                    self.days.drain(..excess);
                }
                self.days.len() - 1
            }
        };
        let day = &mut self.days[idx];
        day.minutes = day.minutes.saturating_add(minutes);
        day.sessions = day.sessions.saturating_add(sessions);
        day
    }

    pub fn total_minutes(&self) -> u64 {
        self.days.iter().map(|d| u64::from(d.minutes)).sum()
    }

    pub fn total_sessions(&self) -> u64 {
        self.days.iter().map(|d| u64::from(d.sessions)).sum()
    }
}
