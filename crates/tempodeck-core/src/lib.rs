//! # Tempodeck Core Library
//!
//! The time-keeping and scheduling engine behind the tempodeck widgets:
//! alarms, a countdown timer, pomodoro focus sessions and a small task
//! list. It follows a CLI-first layout: every operation is reachable from
//! the standalone `tempodeck` binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: deadline-anchored state machine. The caller polls
//!   whenever it likes; elapsed time is always re-derived from the stored
//!   deadline, so suspension of any length cannot cause drift.
//! - **Alarm Matcher**: pure evaluation of alarm definitions against a local
//!   civil minute, gated so each minute is evaluated once.
//! - **Persistence Reconciler**: durable records in a SQLite key/value
//!   table, healed to defaults when corrupt, with missed completions
//!   replayed on load.
//! - **Deck**: the composition root that wires the above to a [`Clock`],
//!   a [`Notifier`] and a [`SoundPlayer`].
//!
//! ## Key Components
//!
//! - [`Deck`]: command surface and `poll()`
//! - [`Countdown`]: the countdown state machine
//! - [`PomodoroSession`]: focus/break phase cycling
//! - [`AlarmBook`] and [`find_due`]: alarm storage and matching
//! - [`Config`]: TOML configuration

pub mod alarm;
pub mod clock;
pub mod countdown;
pub mod deck;
pub mod error;
pub mod events;
pub mod notify;
pub mod pomodoro;
pub mod reconcile;
pub mod snapshot;
pub mod stats;
pub mod storage;
pub mod task;

pub use alarm::{
    find_due, AlarmBook, AlarmDraft, AlarmSchedule, FireTime, MinuteGate, Recurrence, SoundRef,
    BUILT_IN_SOUNDS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{
    Completion, Countdown, CountdownState, CountdownStatus, PartialCredit, Poll, MAX_DURATION_MS,
};
pub use deck::{Deck, DeckBuilder};
pub use error::{
    CommandRejected, ConfigError, CoreError, CorruptPersistedState, StoreError, ValidationError,
};
pub use events::{Event, Target};
pub use notify::{
    LogNotifier, Notification, NotificationKind, Notifier, SilentPlayer, SoundError, SoundPlayer,
    SoundSettings,
};
pub use pomodoro::{Phase, PhaseCompletion, PomodoroPlan, PomodoroSession};
pub use reconcile::Reconciler;
pub use snapshot::{CountdownView, PomodoroView, Snapshot};
pub use stats::{DailyFocusStat, FocusLedger};
pub use storage::{Config, DurableStore, MemoryStore, SqliteStore};
pub use task::{Priority, Task, TaskList, TaskSort, TaskTag};
