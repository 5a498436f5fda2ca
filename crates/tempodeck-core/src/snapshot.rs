//! Read-only views returned by `Deck::poll`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::{Countdown, CountdownStatus};
use crate::events::Event;
use crate::pomodoro::{Phase, PomodoroPlan, PomodoroSession};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownView {
    pub status: CountdownStatus,
    pub remaining_ms: i64,
    pub total_ms: Option<i64>,
    /// 0.0 at start, 1.0 at zero.
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl CountdownView {
    pub fn of(countdown: &Countdown, now: DateTime<Utc>) -> Self {
        let state = countdown.state();
        Self {
            status: state.status(),
            remaining_ms: countdown.remaining(now).num_milliseconds(),
            total_ms: state.total().map(|t| t.num_milliseconds()),
            progress: countdown.progress(now),
            deadline: state.deadline(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomodoroView {
    #[serde(flatten)]
    pub countdown: CountdownView,
    pub phase: Phase,
    pub cycle_index: u32,
    pub cycles_before_long_break: u32,
    pub linked_task_id: Option<String>,
}

impl PomodoroView {
    pub fn of(session: &PomodoroSession, plan: &PomodoroPlan, now: DateTime<Utc>) -> Self {
        let mut countdown = CountdownView::of(session.countdown(), now);
        // An idle session shows the length of the phase it would start.
        countdown.remaining_ms = session.remaining(now, plan).num_milliseconds();
        Self {
            countdown,
            phase: session.phase(),
            cycle_index: session.cycle_index(),
            cycles_before_long_break: plan.cycles_before_long_break,
            linked_task_id: session.linked_task_id().map(str::to_string),
        }
    }
}

/// Everything that is true at `at`, plus the events produced getting there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub at: DateTime<Utc>,
    pub timer: CountdownView,
    pub pomodoro: PomodoroView,
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn idle_pomodoro_shows_full_phase() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let plan = PomodoroPlan::default();
        let view = PomodoroView::of(&PomodoroSession::new(), &plan, now);
        assert_eq!(view.countdown.status, CountdownStatus::Idle);
        assert_eq!(view.countdown.remaining_ms, Duration::minutes(25).num_milliseconds());
        assert_eq!(view.cycle_index, 1);
    }

    #[test]
    fn running_view_tracks_deadline() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let mut cd = Countdown::new();
        cd.start(now, Duration::seconds(100)).unwrap();
        let view = CountdownView::of(&cd, now + Duration::seconds(25));
        assert_eq!(view.remaining_ms, 75_000);
        assert_eq!(view.total_ms, Some(100_000));
        assert!((view.progress - 0.25).abs() < 1e-9);
        assert_eq!(view.deadline, Some(now + Duration::seconds(100)));
    }
}
