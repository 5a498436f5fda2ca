//! Pomodoro session: a countdown plus a phase machine.
//!
//! Phases advance only when the countdown reports a completion (or the user
//! explicitly skips); the caller never has to tell the session that a phase
//! ended.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::{Countdown, CountdownStatus, PartialCredit, Poll};
use crate::error::{CommandRejected, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "focus" => Ok(Phase::Focus),
            "short" | "short_break" => Ok(Phase::ShortBreak),
            "long" | "long_break" => Ok(Phase::LongBreak),
            _ => Err(ValidationError::InvalidValue {
                field: "phase".into(),
                message: format!("unknown phase '{s}' (focus, short, long)"),
            }),
        }
    }
}

/// Phase lengths and cycle count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroPlan {
    pub focus_min: u32,
    pub short_break_min: u32,
    pub long_break_min: u32,
    pub cycles_before_long_break: u32,
}

impl PomodoroPlan {
    pub fn duration(&self, phase: Phase) -> Duration {
        let minutes = match phase {
            Phase::Focus => self.focus_min,
            Phase::ShortBreak => self.short_break_min,
            Phase::LongBreak => self.long_break_min,
        };
        Duration::minutes(i64::from(minutes))
    }

    fn cycles(&self) -> u32 {
        self.cycles_before_long_break.max(1)
    }
}

impl Default for PomodoroPlan {
    fn default() -> Self {
        Self {
            focus_min: 25,
            short_break_min: 5,
            long_break_min: 15,
            cycles_before_long_break: 4,
        }
    }
}

/// A phase that ran to zero, and where the session went next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCompletion {
    pub phase: Phase,
    pub cycle_index: u32,
    /// Length the finished run was armed with.
    pub total: Duration,
    /// Whole focus minutes earned; zero for breaks.
    pub focus_minutes: u32,
    pub finished_at: DateTime<Utc>,
    pub next_phase: Phase,
    pub next_cycle_index: u32,
    pub linked_task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroSession {
    countdown: Countdown,
    phase: Phase,
    cycle_index: u32,
    linked_task_id: Option<String>,
}

impl Default for PomodoroSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PomodoroSession {
    pub fn new() -> Self {
        Self {
            countdown: Countdown::new(),
            phase: Phase::Focus,
            cycle_index: 1,
            linked_task_id: None,
        }
    }

    /// Rebuild a session from persisted parts. A zero cycle index becomes 1.
    pub fn from_parts(
        countdown: Countdown,
        phase: Phase,
        cycle_index: u32,
        linked_task_id: Option<String>,
    ) -> Self {
        Self {
            countdown,
            phase,
            cycle_index: cycle_index.max(1),
            linked_task_id,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycle_index(&self) -> u32 {
        self.cycle_index
    }

    pub fn linked_task_id(&self) -> Option<&str> {
        self.linked_task_id.as_deref()
    }

    /// Remaining time; an idle session shows the full phase length.
    pub fn remaining(&self, now: DateTime<Utc>, plan: &PomodoroPlan) -> Duration {
        match self.countdown.status() {
            CountdownStatus::Idle => plan.duration(self.phase),
            _ => self.countdown.remaining(now),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the current phase, or continue it when paused.
    pub fn start(&mut self, now: DateTime<Utc>, plan: &PomodoroPlan) -> Result<DateTime<Utc>, CommandRejected> {
        if self.countdown.status() == CountdownStatus::Paused {
            return self.countdown.resume(now);
        }
        self.countdown.start(now, plan.duration(self.phase))
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Duration, CommandRejected> {
        self.countdown.pause(now)
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>, CommandRejected> {
        self.countdown.resume(now)
    }

    /// Back to the start of the current phase.
    pub fn reset(&mut self) {
        self.countdown.reset();
    }

    /// Jump to `phase` without touching the cycle counter.
    pub fn switch_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.countdown.reset();
    }

    /// Advance to the next phase without crediting anything.
    pub fn skip(&mut self, plan: &PomodoroPlan) -> Phase {
        let (phase, cycle) = self.next(plan);
        self.phase = phase;
        self.cycle_index = cycle;
        self.countdown.reset();
        phase
    }

    /// Stop a focus run early, reporting the partial credit it earned.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<PartialCredit, CommandRejected> {
        let status = self.countdown.status();
        let abandonable = self.phase == Phase::Focus
            && matches!(status, CountdownStatus::Running | CountdownStatus::Paused);
        if !abandonable {
            return Err(CommandRejected::InvalidTransition {
                command: "abandon",
                from: status,
            });
        }
        let credit = self.countdown.elapsed_since_pause(now);
        self.countdown.reset();
        Ok(credit)
    }

    pub fn link_task(&mut self, task_id: impl Into<String>) {
        self.linked_task_id = Some(task_id.into());
    }

    pub fn unlink_task(&mut self) -> Option<String> {
        self.linked_task_id.take()
    }

    /// Poll the countdown and advance the phase on completion.
    pub fn poll(&mut self, now: DateTime<Utc>, plan: &PomodoroPlan) -> (Poll, Option<PhaseCompletion>) {
        let poll = self.countdown.poll(now);
        let Some(completion) = poll.completion else {
            return (poll, None);
        };

        let finished = self.phase;
        let finished_cycle = self.cycle_index;
        let (next_phase, next_cycle) = self.next(plan);
        self.phase = next_phase;
        self.cycle_index = next_cycle;

        let focus_minutes = match finished {
            Phase::Focus => u32::try_from(completion.total.num_minutes()).unwrap_or(0),
            Phase::ShortBreak | Phase::LongBreak => 0,
        };
        let phase_completion = PhaseCompletion {
            phase: finished,
            cycle_index: finished_cycle,
            total: completion.total,
            focus_minutes,
            finished_at: completion.finished_at,
            next_phase,
            next_cycle_index: next_cycle,
            linked_task_id: self.linked_task_id.clone(),
        };
        (poll, Some(phase_completion))
    }

    fn next(&self, plan: &PomodoroPlan) -> (Phase, u32) {
        match self.phase {
            Phase::Focus if self.cycle_index < plan.cycles() => (Phase::ShortBreak, self.cycle_index),
            Phase::Focus => (Phase::LongBreak, self.cycle_index),
            Phase::ShortBreak => (Phase::Focus, (self.cycle_index + 1).min(plan.cycles())),
            Phase::LongBreak => (Phase::Focus, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn run_phase(session: &mut PomodoroSession, now: &mut DateTime<Utc>, plan: &PomodoroPlan) -> PhaseCompletion {
        session.start(*now, plan).unwrap();
        *now += plan.duration(session.phase());
        let (_, completion) = session.poll(*now, plan);
        completion.expect("phase should complete at its deadline")
    }

    #[test]
    fn full_cycle_reaches_long_break() {
        let plan = PomodoroPlan::default();
        let mut session = PomodoroSession::new();
        let mut now = t0();

        let mut phases = Vec::new();
        for _ in 0..8 {
            let done = run_phase(&mut session, &mut now, &plan);
            phases.push((done.phase, done.cycle_index));
        }
        assert_eq!(
            phases,
            vec![
                (Phase::Focus, 1),
                (Phase::ShortBreak, 1),
                (Phase::Focus, 2),
                (Phase::ShortBreak, 2),
                (Phase::Focus, 3),
                (Phase::ShortBreak, 3),
                (Phase::Focus, 4),
                (Phase::LongBreak, 4),
            ]
        );
        assert_eq!(session.phase(), Phase::Focus);
        assert_eq!(session.cycle_index(), 1);
    }

    #[test]
    fn focus_completion_earns_minutes() {
        let plan = PomodoroPlan::default();
        let mut session = PomodoroSession::new();
        session.link_task("task-1");
        let mut now = t0();
        let done = run_phase(&mut session, &mut now, &plan);
        assert_eq!(done.focus_minutes, 25);
        assert_eq!(done.next_phase, Phase::ShortBreak);
        assert_eq!(done.linked_task_id.as_deref(), Some("task-1"));

        let done = run_phase(&mut session, &mut now, &plan);
        assert_eq!(done.focus_minutes, 0);
    }

    #[test]
    fn completion_advances_once() {
        let plan = PomodoroPlan::default();
        let mut session = PomodoroSession::new();
        session.start(t0(), &plan).unwrap();
        let late = t0() + Duration::hours(5);
        assert!(session.poll(late, &plan).1.is_some());
        assert!(session.poll(late, &plan).1.is_none());
        assert_eq!(session.phase(), Phase::ShortBreak);
        assert_eq!(session.countdown().status(), CountdownStatus::Completed);
    }

    #[test]
    fn start_while_paused_resumes() {
        let plan = PomodoroPlan::default();
        let mut session = PomodoroSession::new();
        session.start(t0(), &plan).unwrap();
        session.pause(t0() + Duration::minutes(10)).unwrap();
        let later = t0() + Duration::hours(1);
        session.start(later, &plan).unwrap();
        assert_eq!(session.remaining(later, &plan), Duration::minutes(15));
    }

    #[test]
    fn abandon_credits_whole_minutes() {
        let plan = PomodoroPlan::default();
        let mut session = PomodoroSession::new();
        session.start(t0(), &plan).unwrap();
        let credit = session.abandon(t0() + Duration::seconds(90)).unwrap();
        assert_eq!(credit, PartialCredit::Credited { minutes: 1 });
        assert_eq!(session.countdown().status(), CountdownStatus::Idle);
        assert_eq!(session.phase(), Phase::Focus);
    }

    #[test]
    fn abandon_requires_active_focus() {
        let plan = PomodoroPlan::default();
        let mut session = PomodoroSession::new();
        assert!(session.abandon(t0()).is_err());
        session.switch_phase(Phase::ShortBreak);
        session.start(t0(), &plan).unwrap();
        assert!(session.abandon(t0() + Duration::minutes(2)).is_err());
    }

    #[test]
    fn skip_follows_cycle_rules() {
        let plan = PomodoroPlan {
            cycles_before_long_break: 2,
            ..PomodoroPlan::default()
        };
        let mut session = PomodoroSession::new();
        assert_eq!(session.skip(&plan), Phase::ShortBreak);
        assert_eq!(session.skip(&plan), Phase::Focus);
        assert_eq!(session.cycle_index(), 2);
        assert_eq!(session.skip(&plan), Phase::LongBreak);
        assert_eq!(session.skip(&plan), Phase::Focus);
        assert_eq!(session.cycle_index(), 1);
    }

    #[test]
    fn idle_session_shows_phase_length() {
        let plan = PomodoroPlan::default();
        let mut session = PomodoroSession::new();
        assert_eq!(session.remaining(t0(), &plan), Duration::minutes(25));
        session.switch_phase(Phase::LongBreak);
        assert_eq!(session.remaining(t0(), &plan), Duration::minutes(15));
    }

    #[test]
    fn phase_parses_cli_spellings() {
        assert_eq!("focus".parse::<Phase>().unwrap(), Phase::Focus);
        assert_eq!("short-break".parse::<Phase>().unwrap(), Phase::ShortBreak);
        assert_eq!("Long Break".parse::<Phase>().unwrap(), Phase::LongBreak);
        assert!("nap".parse::<Phase>().is_err());
    }
}
