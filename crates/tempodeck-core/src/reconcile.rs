//! Persistence reconciler.
//!
//! Owns the durable encoding of everything the deck keeps. Countdowns are
//! written as absolute deadlines (epoch milliseconds), never as "seconds
//! remaining", so a record read back hours later still means the same
//! thing.
//!
//! Loading never fails. An absent record yields the default, and a record
//! that cannot be decoded or violates the countdown invariants is logged
//! and replaced by the default. A running countdown whose deadline passed
//! while nobody was looking is polled once during load, and the completion
//! is handed back so the caller can replay it.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmBook, MinuteGate};
use crate::countdown::{Completion, Countdown, CountdownState, CountdownStatus, MAX_DURATION_MS};
use crate::error::{CorruptPersistedState, Result};
use crate::pomodoro::{Phase, PhaseCompletion, PomodoroPlan, PomodoroSession};
use crate::stats::FocusLedger;
use crate::storage::DurableStore;
use crate::task::TaskList;

pub const TIMER_KEY: &str = "timer";
pub const POMODORO_KEY: &str = "pomodoro";
pub const ALARMS_KEY: &str = "alarms";
pub const ALARM_CURSOR_KEY: &str = "alarm_cursor";
pub const FOCUS_STATS_KEY: &str = "focus_stats";
pub const TASKS_KEY: &str = "tasks";

/// Durable shape of a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownRecord {
    pub status: CountdownStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_ms: Option<i64>,
}

impl From<&CountdownState> for CountdownRecord {
    fn from(state: &CountdownState) -> Self {
        let mut record = CountdownRecord {
            status: state.status(),
            deadline: None,
            remaining_ms: None,
            total_ms: state.total().map(|t| t.num_milliseconds()),
        };
        match state {
            CountdownState::Running { deadline, .. } => record.deadline = Some(*deadline),
            CountdownState::Paused { remaining, .. } => {
                record.remaining_ms = Some(remaining.num_milliseconds())
            }
            CountdownState::Idle | CountdownState::Completed { .. } => {}
        }
        record
    }
}

impl TryFrom<CountdownRecord> for CountdownState {
    type Error = CorruptPersistedState;

    fn try_from(record: CountdownRecord) -> Result<Self, Self::Error> {
        let corrupt = |reason: &str| CorruptPersistedState(reason.to_string());
        let total = || match record.total_ms {
            Some(ms) if ms > MAX_DURATION_MS => Err(corrupt("total exceeds the longest countdown")),
            Some(ms) if ms > 0 => Ok(Duration::milliseconds(ms)),
            Some(_) => Err(corrupt("total must be positive")),
            None => Err(corrupt("missing total")),
        };

        match record.status {
            CountdownStatus::Idle => Ok(CountdownState::Idle),
            CountdownStatus::Running => {
                let deadline = record
                    .deadline
                    .ok_or_else(|| corrupt("running without deadline"))?;
                if record.remaining_ms.is_some() {
                    return Err(corrupt("running record also carries remaining time"));
                }
                Ok(CountdownState::Running {
                    deadline,
                    total: total()?,
                })
            }
            CountdownStatus::Paused => {
                if record.deadline.is_some() {
                    return Err(corrupt("paused record also carries a deadline"));
                }
                let remaining = match record.remaining_ms {
                    Some(ms) if ms >= 0 => Duration::milliseconds(ms),
                    Some(_) => return Err(corrupt("negative remaining time")),
                    None => return Err(corrupt("paused without remaining time")),
                };
                let total = total()?;
                if remaining > total {
                    return Err(corrupt("remaining time exceeds total"));
                }
                Ok(CountdownState::Paused { remaining, total })
            }
            CountdownStatus::Completed => Ok(CountdownState::Completed {
                total: total().unwrap_or_else(|_| Duration::zero()),
            }),
        }
    }
}

/// Durable shape of a pomodoro session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroRecord {
    pub countdown: CountdownRecord,
    pub phase: Phase,
    pub cycle_index: u32,
    #[serde(default)]
    pub linked_task_id: Option<String>,
}

/// A loaded value plus the completion that was replayed while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T, C> {
    pub value: T,
    pub replayed: Option<C>,
}

pub struct Reconciler<S> {
    store: S,
}

impl<S: DurableStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ── Countdown timer ──────────────────────────────────────────────

    /// An idle timer has no record at all.
    pub fn save_timer(&mut self, countdown: &Countdown) -> Result<()> {
        match countdown.status() {
            CountdownStatus::Idle => self.discard(TIMER_KEY),
            _ => self.write(TIMER_KEY, &CountdownRecord::from(&countdown.state())),
        }
    }

    pub fn load_timer(&self, now: DateTime<Utc>) -> Loaded<Countdown, Completion> {
        let mut countdown = self
            .read::<CountdownRecord>(TIMER_KEY)
            .map(|record| decode_countdown(TIMER_KEY, record))
            .unwrap_or_default();
        let replayed = countdown.poll(now).completion;
        if let Some(done) = &replayed {
            tracing::info!(finished_at = %done.finished_at, "timer finished while suspended");
        }
        Loaded {
            value: countdown,
            replayed,
        }
    }

    // ── Pomodoro ─────────────────────────────────────────────────────

    pub fn save_pomodoro(&mut self, session: &PomodoroSession) -> Result<()> {
        let record = PomodoroRecord {
            countdown: CountdownRecord::from(&session.countdown().state()),
            phase: session.phase(),
            cycle_index: session.cycle_index(),
            linked_task_id: session.linked_task_id().map(str::to_string),
        };
        self.write(POMODORO_KEY, &record)
    }

    pub fn load_pomodoro(
        &self,
        now: DateTime<Utc>,
        plan: &PomodoroPlan,
    ) -> Loaded<PomodoroSession, PhaseCompletion> {
        let mut session = match self.read::<PomodoroRecord>(POMODORO_KEY) {
            Some(record) => PomodoroSession::from_parts(
                decode_countdown(POMODORO_KEY, record.countdown),
                record.phase,
                record.cycle_index,
                record.linked_task_id,
            ),
            None => PomodoroSession::new(),
        };
        let (_, replayed) = session.poll(now, plan);
        if let Some(done) = &replayed {
            tracing::info!(
                phase = %done.phase,
                finished_at = %done.finished_at,
                "pomodoro phase finished while suspended"
            );
        }
        Loaded {
            value: session,
            replayed,
        }
    }

    // ── Lists ────────────────────────────────────────────────────────

    pub fn save_alarms(&mut self, alarms: &AlarmBook) -> Result<()> {
        self.write(ALARMS_KEY, alarms)
    }

    pub fn load_alarms(&self) -> AlarmBook {
        self.read(ALARMS_KEY).unwrap_or_default()
    }

    pub fn save_alarm_cursor(&mut self, gate: &MinuteGate) -> Result<()> {
        self.write(ALARM_CURSOR_KEY, gate)
    }

    pub fn load_alarm_cursor(&self) -> MinuteGate {
        self.read(ALARM_CURSOR_KEY).unwrap_or_default()
    }

    pub fn save_stats(&mut self, stats: &FocusLedger) -> Result<()> {
        self.write(FOCUS_STATS_KEY, stats)
    }

    pub fn load_stats(&self) -> FocusLedger {
        self.read(FOCUS_STATS_KEY).unwrap_or_default()
    }

    pub fn save_tasks(&mut self, tasks: &TaskList) -> Result<()> {
        self.write(TASKS_KEY, tasks)
    }

    pub fn load_tasks(&self) -> TaskList {
        self.read(TASKS_KEY).unwrap_or_default()
    }

    pub fn discard(&mut self, key: &str) -> Result<()> {
        self.store.remove(key)?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed, using default");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable record");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(key, &bytes)?;
        tracing::debug!(key, bytes = bytes.len(), "record saved");
        Ok(())
    }
}

fn decode_countdown(key: &str, record: CountdownRecord) -> Countdown {
    match CountdownState::try_from(record) {
        Ok(state) => Countdown::from_state(state),
        Err(e) => {
            tracing::warn!(key, error = %e, "healing corrupt countdown to idle");
            Countdown::new()
        }
    }
}
