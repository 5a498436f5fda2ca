use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::FireTime;
use crate::pomodoro::Phase;

/// Which countdown an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Timer,
    Pomodoro,
}

/// Every state change in the deck produces an Event.
/// Callers render them; the engine never depends on anyone reading them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CountdownStarted {
        target: Target,
        duration_ms: i64,
        deadline: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    CountdownPaused {
        target: Target,
        remaining_ms: i64,
        at: DateTime<Utc>,
    },
    CountdownResumed {
        target: Target,
        remaining_ms: i64,
        deadline: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    CountdownReset {
        target: Target,
        at: DateTime<Utc>,
    },
    /// A run hit zero. `replayed` marks completions that happened while
    /// nobody was polling and were only observed on reload.
    CountdownCompleted {
        target: Target,
        total_ms: i64,
        finished_at: DateTime<Utc>,
        replayed: bool,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        cycle_index: u32,
        at: DateTime<Utc>,
    },
    FocusCredited {
        date: NaiveDate,
        minutes: u32,
        sessions: u32,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// An early stop that earned less than a whole minute.
    FocusTooShort {
        at: DateTime<Utc>,
    },
    TaskLinked {
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    AlarmFired {
        alarm_id: String,
        label: String,
        fire_time: FireTime,
        auto_disabled: bool,
        at: DateTime<Utc>,
    },
    /// A command that did not apply; state is unchanged.
    CommandIgnored {
        target: Target,
        reason: String,
        at: DateTime<Utc>,
    },
}
