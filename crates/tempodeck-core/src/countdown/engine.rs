//! Deadline-anchored countdown.
//!
//! The countdown never accumulates ticks. While running it stores only the
//! absolute instant at which it reaches zero, and every query recomputes the
//! remaining time from the caller-supplied `now`. A poll after an arbitrarily
//! long gap (process suspension, device sleep, reload) lands on the same
//! answer as a poll every few milliseconds would.
//!
//! ## State Transitions
//!
//! ```text
//! Idle ──start──> Running ──pause──> Paused
//!   ^               │  ^               │
//!   │             poll └────resume─────┘
//!   │               v
//!   └──reset── Completed ──start──> Running
//! ```
//!
//! Every operation takes `now` explicitly; the engine never reads a clock.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CommandRejected;

/// Longest run a countdown accepts, in milliseconds (366 days).
pub const MAX_DURATION_MS: i64 = 366 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for CountdownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CountdownStatus::Idle => "idle",
            CountdownStatus::Running => "running",
            CountdownStatus::Paused => "paused",
            CountdownStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Authoritative countdown state.
///
/// `total` is carried for progress display and partial credit only; it is
/// never used to compute remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountdownState {
    #[default]
    Idle,
    Running {
        deadline: DateTime<Utc>,
        total: Duration,
    },
    Paused {
        remaining: Duration,
        total: Duration,
    },
    Completed {
        total: Duration,
    },
}

impl CountdownState {
    pub fn status(&self) -> CountdownStatus {
        match self {
            CountdownState::Idle => CountdownStatus::Idle,
            CountdownState::Running { .. } => CountdownStatus::Running,
            CountdownState::Paused { .. } => CountdownStatus::Paused,
            CountdownState::Completed { .. } => CountdownStatus::Completed,
        }
    }

    pub fn total(&self) -> Option<Duration> {
        match self {
            CountdownState::Idle => None,
            CountdownState::Running { total, .. }
            | CountdownState::Paused { total, .. }
            | CountdownState::Completed { total } => Some(*total),
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match self {
            CountdownState::Running { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }
}

/// A run that reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Configured duration of the finished run.
    pub total: Duration,
    /// The instant the run actually hit zero (its deadline), which may lie
    /// well before the poll that observed it.
    pub finished_at: DateTime<Utc>,
}

/// Answer to "what is true now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    pub status: CountdownStatus,
    pub remaining: Duration,
    /// Present only on the poll that observed the run finishing.
    pub completion: Option<Completion>,
}

/// Outcome of crediting an abandoned run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PartialCredit {
    Credited { minutes: u32 },
    TooShort,
}

/// Core countdown engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    state: CountdownState,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: CountdownState) -> Self {
        Self { state }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn status(&self) -> CountdownStatus {
        self.state.status()
    }

    /// Remaining time at `now`, clamped to zero. Does not transition.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            CountdownState::Running { deadline, .. } => clamp(deadline - now),
            CountdownState::Paused { remaining, .. } => remaining,
            CountdownState::Idle | CountdownState::Completed { .. } => Duration::zero(),
        }
    }

    /// 0.0 .. 1.0 progress through the current run.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        match self.state {
            CountdownState::Idle => 0.0,
            CountdownState::Completed { .. } => 1.0,
            CountdownState::Running { total, .. } | CountdownState::Paused { total, .. } => {
                let total_ms = total.num_milliseconds();
                if total_ms <= 0 {
                    return 0.0;
                }
                let remaining_ms = self.remaining(now).num_milliseconds();
                (1.0 - remaining_ms as f64 / total_ms as f64).clamp(0.0, 1.0)
            }
        }
    }

    /// Time spent in the current run so far: `total - remaining`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.state.total() {
            Some(total) => clamp(total - self.remaining(now)),
            None => Duration::zero(),
        }
    }

    /// Whole minutes of the current run that may be credited when the user
    /// stops early. Under one whole minute credits nothing.
    pub fn elapsed_since_pause(&self, now: DateTime<Utc>) -> PartialCredit {
        let minutes = self.elapsed(now).num_minutes();
        if minutes < 1 {
            return PartialCredit::TooShort;
        }
        PartialCredit::Credited {
            minutes: u32::try_from(minutes).unwrap_or(u32::MAX),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, CommandRejected> {
        if duration <= Duration::zero() {
            return Err(CommandRejected::InvalidDuration);
        }
        if duration.num_milliseconds() > MAX_DURATION_MS {
            return Err(CommandRejected::DurationOutOfRange);
        }
        match self.state {
            CountdownState::Idle | CountdownState::Paused { .. } | CountdownState::Completed { .. } => {
                let deadline = anchor(now, duration)?;
                self.state = CountdownState::Running {
                    deadline,
                    total: duration,
                };
                Ok(deadline)
            }
            CountdownState::Running { .. } => Err(self.rejected("start")),
        }
    }

    /// Freezes the remaining time. Returns the snapshot taken.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Duration, CommandRejected> {
        match self.state {
            CountdownState::Running { deadline, total } => {
                let remaining = clamp(deadline - now);
                self.state = CountdownState::Paused { remaining, total };
                Ok(remaining)
            }
            _ => Err(self.rejected("pause")),
        }
    }

    /// Re-anchors the frozen remaining time to a new deadline.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<DateTime<Utc>, CommandRejected> {
        match self.state {
            CountdownState::Paused { remaining, total } => {
                let deadline = anchor(now, remaining)?;
                self.state = CountdownState::Running { deadline, total };
                Ok(deadline)
            }
            _ => Err(self.rejected("resume")),
        }
    }

    pub fn reset(&mut self) {
        self.state = CountdownState::Idle;
    }

    /// Call whenever the display wants fresh numbers.
    ///
    /// Completes a running countdown whose deadline has passed and reports
    /// that completion exactly once; later polls see `Completed` with zero
    /// remaining and no completion.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Poll {
        if let CountdownState::Running { deadline, total } = self.state {
            if now >= deadline {
                self.state = CountdownState::Completed { total };
                return Poll {
                    status: CountdownStatus::Completed,
                    remaining: Duration::zero(),
                    completion: Some(Completion {
                        total,
                        finished_at: deadline,
                    }),
                };
            }
        }
        Poll {
            status: self.status(),
            remaining: self.remaining(now),
            completion: None,
        }
    }

    fn rejected(&self, command: &'static str) -> CommandRejected {
        CommandRejected::InvalidTransition {
            command,
            from: self.status(),
        }
    }
}

fn anchor(now: DateTime<Utc>, span: Duration) -> Result<DateTime<Utc>, CommandRejected> {
    now.checked_add_signed(span)
        .ok_or(CommandRejected::DurationOutOfRange)
}

fn clamp(d: Duration) -> Duration {
    d.max(Duration::zero())
}
