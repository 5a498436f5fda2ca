//! The deck: composition root for the time-keeping engine.
//!
//! A [`Deck`] owns the clock, the durable store, the collaborators and
//! every piece of live state. Commands mutate and then write through the
//! reconciler before returning. [`Deck::poll`] is the refresh cue: it
//! observes both countdowns, evaluates alarms for a new minute, and hands
//! back a [`Snapshot`] together with every event produced since the last
//! poll.
//!
//! ## Usage
//!
//! ```ignore
//! let mut deck = Deck::builder(SystemClock, SqliteStore::open_default()?)
//!     .plan(config.pomodoro_plan())
//!     .open()?;
//! deck.timer_start(Duration::minutes(3))?;
//! loop {
//!     let snapshot = deck.poll()?;
//!     render(&snapshot);
//! }
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::alarm::{find_due, AlarmBook, AlarmDraft, AlarmSchedule, MinuteGate, SoundRef};
use crate::clock::Clock;
use crate::countdown::{Completion, Countdown, CountdownStatus, PartialCredit};
use crate::error::{CommandRejected, CoreError, Result};
use crate::events::{Event, Target};
use crate::notify::{
    LogNotifier, Notification, NotificationKind, Notifier, SilentPlayer, SoundPlayer,
};
use crate::pomodoro::{Phase, PhaseCompletion, PomodoroPlan, PomodoroSession};
use crate::reconcile::Reconciler;
use crate::snapshot::{CountdownView, PomodoroView, Snapshot};
use crate::stats::FocusLedger;
use crate::storage::DurableStore;
use crate::task::{Priority, Task, TaskList, TaskTag};

pub struct DeckBuilder<C, S> {
    clock: C,
    store: S,
    plan: PomodoroPlan,
    notifier: Box<dyn Notifier>,
    sound: Box<dyn SoundPlayer>,
    completion_sound: SoundRef,
}

impl<C: Clock, S: DurableStore> DeckBuilder<C, S> {
    pub fn plan(mut self, plan: PomodoroPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn sound_player(mut self, player: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(player);
        self
    }

    /// Sound played when the timer or a pomodoro phase finishes.
    pub fn completion_sound(mut self, sound: SoundRef) -> Self {
        self.completion_sound = sound;
        self
    }

    /// Load every record and replay completions missed while suspended.
    ///
    /// Replayed completions are notified immediately; their events are
    /// delivered by the first [`Deck::poll`].
    pub fn open(self) -> Result<Deck<C, S>> {
        let now = self.clock.now();
        let reconciler = Reconciler::new(self.store);
        let timer = reconciler.load_timer(now);
        let pomodoro = reconciler.load_pomodoro(now, &self.plan);

        let mut deck = Deck {
            alarms: reconciler.load_alarms(),
            gate: reconciler.load_alarm_cursor(),
            stats: reconciler.load_stats(),
            tasks: reconciler.load_tasks(),
            timer: timer.value,
            pomodoro: pomodoro.value,
            clock: self.clock,
            reconciler,
            plan: self.plan,
            notifier: self.notifier,
            sound: self.sound,
            completion_sound: self.completion_sound,
            backlog: Vec::new(),
        };

        if let Some(done) = timer.replayed {
            deck.finish_timer(done, true)?;
        }
        if let Some(done) = pomodoro.replayed {
            deck.finish_phase(done, true)?;
        }
        Ok(deck)
    }
}

pub struct Deck<C, S> {
    clock: C,
    reconciler: Reconciler<S>,
    plan: PomodoroPlan,
    notifier: Box<dyn Notifier>,
    sound: Box<dyn SoundPlayer>,
    completion_sound: SoundRef,
    timer: Countdown,
    pomodoro: PomodoroSession,
    alarms: AlarmBook,
    gate: MinuteGate,
    stats: FocusLedger,
    tasks: TaskList,
    /// Events produced outside `poll`, delivered by the next `poll`.
    backlog: Vec<Event>,
}

impl<C: Clock, S: DurableStore> Deck<C, S> {
    pub fn builder(clock: C, store: S) -> DeckBuilder<C, S> {
        DeckBuilder {
            clock,
            store,
            plan: PomodoroPlan::default(),
            notifier: Box::new(LogNotifier),
            sound: Box::new(SilentPlayer),
            completion_sound: SoundRef::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn plan(&self) -> &PomodoroPlan {
        &self.plan
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn pomodoro(&self) -> &PomodoroSession {
        &self.pomodoro
    }

    pub fn alarms(&self) -> &AlarmBook {
        &self.alarms
    }

    pub fn stats(&self) -> &FocusLedger {
        &self.stats
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    /// Current views without observing completions or alarms.
    pub fn view(&self) -> Snapshot {
        self.snapshot_at(self.clock.now(), Vec::new())
    }

    pub fn into_store(self) -> S {
        self.reconciler.into_store()
    }

    // ── Poll ─────────────────────────────────────────────────────────

    /// Answer "what is true now?".
    ///
    /// Completes any countdown whose deadline has passed (exactly once),
    /// fires alarms due in a minute not evaluated before, and drains the
    /// pending events.
    pub fn poll(&mut self) -> Result<Snapshot> {
        let now = self.clock.now();
        self.settle(now)?;
        self.fire_alarms(now)?;
        let events = std::mem::take(&mut self.backlog);
        Ok(self.snapshot_at(now, events))
    }

    // ── Timer commands ───────────────────────────────────────────────

    pub fn timer_start(&mut self, duration: Duration) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        match self.timer.start(now, duration) {
            Ok(deadline) => {
                self.reconciler.save_timer(&self.timer)?;
                tracing::debug!(%deadline, "timer started");
                Ok(Event::CountdownStarted {
                    target: Target::Timer,
                    duration_ms: duration.num_milliseconds(),
                    deadline,
                    at: now,
                })
            }
            Err(rejected) => Ok(ignored(Target::Timer, rejected, now)),
        }
    }

    pub fn timer_pause(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        match self.timer.pause(now) {
            Ok(remaining) => {
                self.reconciler.save_timer(&self.timer)?;
                Ok(Event::CountdownPaused {
                    target: Target::Timer,
                    remaining_ms: remaining.num_milliseconds(),
                    at: now,
                })
            }
            Err(rejected) => Ok(ignored(Target::Timer, rejected, now)),
        }
    }

    pub fn timer_resume(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        match self.timer.resume(now) {
            Ok(deadline) => {
                self.reconciler.save_timer(&self.timer)?;
                Ok(Event::CountdownResumed {
                    target: Target::Timer,
                    remaining_ms: (deadline - now).num_milliseconds(),
                    deadline,
                    at: now,
                })
            }
            Err(rejected) => Ok(ignored(Target::Timer, rejected, now)),
        }
    }

    /// Back to idle; the persisted record is discarded.
    pub fn timer_reset(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.timer.reset();
        self.reconciler.save_timer(&self.timer)?;
        Ok(Event::CountdownReset {
            target: Target::Timer,
            at: now,
        })
    }

    // ── Pomodoro commands ────────────────────────────────────────────

    /// Start the current phase, or continue it if paused.
    pub fn pomodoro_start(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        let was_paused = self.pomodoro.countdown().status() == CountdownStatus::Paused;
        match self.pomodoro.start(now, &self.plan) {
            Ok(deadline) => {
                self.reconciler.save_pomodoro(&self.pomodoro)?;
                tracing::debug!(phase = %self.pomodoro.phase(), %deadline, "pomodoro started");
                let remaining_ms = (deadline - now).num_milliseconds();
                Ok(if was_paused {
                    Event::CountdownResumed {
                        target: Target::Pomodoro,
                        remaining_ms,
                        deadline,
                        at: now,
                    }
                } else {
                    Event::CountdownStarted {
                        target: Target::Pomodoro,
                        duration_ms: remaining_ms,
                        deadline,
                        at: now,
                    }
                })
            }
            Err(rejected) => Ok(ignored(Target::Pomodoro, rejected, now)),
        }
    }

    pub fn pomodoro_pause(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        match self.pomodoro.pause(now) {
            Ok(remaining) => {
                self.reconciler.save_pomodoro(&self.pomodoro)?;
                Ok(Event::CountdownPaused {
                    target: Target::Pomodoro,
                    remaining_ms: remaining.num_milliseconds(),
                    at: now,
                })
            }
            Err(rejected) => Ok(ignored(Target::Pomodoro, rejected, now)),
        }
    }

    pub fn pomodoro_resume(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        match self.pomodoro.resume(now) {
            Ok(deadline) => {
                self.reconciler.save_pomodoro(&self.pomodoro)?;
                Ok(Event::CountdownResumed {
                    target: Target::Pomodoro,
                    remaining_ms: (deadline - now).num_milliseconds(),
                    deadline,
                    at: now,
                })
            }
            Err(rejected) => Ok(ignored(Target::Pomodoro, rejected, now)),
        }
    }

    /// Back to the start of the current phase.
    pub fn pomodoro_reset(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.pomodoro.reset();
        self.reconciler.save_pomodoro(&self.pomodoro)?;
        Ok(Event::CountdownReset {
            target: Target::Pomodoro,
            at: now,
        })
    }

    /// Advance to the next phase without crediting anything.
    pub fn pomodoro_skip(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        let from = self.pomodoro.phase();
        let to = self.pomodoro.skip(&self.plan);
        self.reconciler.save_pomodoro(&self.pomodoro)?;
        Ok(Event::PhaseChanged {
            from,
            to,
            cycle_index: self.pomodoro.cycle_index(),
            at: now,
        })
    }

    pub fn pomodoro_switch_phase(&mut self, phase: Phase) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        let from = self.pomodoro.phase();
        self.pomodoro.switch_phase(phase);
        self.reconciler.save_pomodoro(&self.pomodoro)?;
        Ok(Event::PhaseChanged {
            from,
            to: phase,
            cycle_index: self.pomodoro.cycle_index(),
            at: now,
        })
    }

    /// Stop a focus run early. Whole elapsed minutes are credited to the
    /// ledger (without counting a session) and to the linked task.
    pub fn pomodoro_abandon(&mut self) -> Result<Event> {
        let now = self.clock.now();
        self.settle(now)?;
        let credit = match self.pomodoro.abandon(now) {
            Ok(credit) => credit,
            Err(rejected) => return Ok(ignored(Target::Pomodoro, rejected, now)),
        };
        self.reconciler.save_pomodoro(&self.pomodoro)?;
        match credit {
            PartialCredit::Credited { minutes } => {
                let task_id = self.pomodoro.linked_task_id().map(str::to_string);
                self.credit_focus(now, minutes, 0, task_id)
            }
            PartialCredit::TooShort => {
                tracing::debug!("abandoned focus run too short to credit");
                Ok(Event::FocusTooShort { at: now })
            }
        }
    }

    pub fn pomodoro_link_task(&mut self, task_id: &str) -> Result<Event> {
        if self.tasks.get(task_id).is_none() {
            return Err(CoreError::not_found("task", task_id));
        }
        self.pomodoro.link_task(task_id);
        self.reconciler.save_pomodoro(&self.pomodoro)?;
        Ok(Event::TaskLinked {
            task_id: Some(task_id.to_string()),
            at: self.clock.now(),
        })
    }

    pub fn pomodoro_unlink_task(&mut self) -> Result<Event> {
        self.pomodoro.unlink_task();
        self.reconciler.save_pomodoro(&self.pomodoro)?;
        Ok(Event::TaskLinked {
            task_id: None,
            at: self.clock.now(),
        })
    }

    /// Replace the phase lengths. A running phase keeps its deadline; the
    /// new lengths apply from the next start.
    pub fn set_plan(&mut self, plan: PomodoroPlan) {
        self.plan = plan;
    }

    // ── Alarm commands ───────────────────────────────────────────────

    pub fn add_alarm(&mut self, draft: AlarmDraft) -> Result<AlarmSchedule> {
        let alarm = self.alarms.add(draft).clone();
        self.reconciler.save_alarms(&self.alarms)?;
        tracing::debug!(id = alarm.id(), fire_time = %alarm.fire_time, "alarm added");
        Ok(alarm)
    }

    pub fn update_alarm(&mut self, id: &str, draft: AlarmDraft) -> Result<AlarmSchedule> {
        let alarm = self.alarms.update(id, draft)?.clone();
        self.reconciler.save_alarms(&self.alarms)?;
        Ok(alarm)
    }

    /// Flip an alarm on or off; returns the new `enabled` value.
    pub fn toggle_alarm(&mut self, id: &str) -> Result<bool> {
        let enabled = self.alarms.toggle(id)?;
        self.reconciler.save_alarms(&self.alarms)?;
        Ok(enabled)
    }

    pub fn remove_alarm(&mut self, id: &str) -> Result<AlarmSchedule> {
        let alarm = self.alarms.remove(id)?;
        self.reconciler.save_alarms(&self.alarms)?;
        Ok(alarm)
    }

    // ── Task commands ────────────────────────────────────────────────

    pub fn add_task(&mut self, text: &str, priority: Priority, tag: TaskTag) -> Result<Task> {
        let now = self.clock.now();
        let task = self.tasks.add(text, priority, tag, now)?.clone();
        self.reconciler.save_tasks(&self.tasks)?;
        Ok(task)
    }

    /// Flip a task's completion; returns the new value.
    pub fn toggle_task(&mut self, id: &str) -> Result<bool> {
        let completed = self.tasks.toggle(id)?;
        self.reconciler.save_tasks(&self.tasks)?;
        Ok(completed)
    }

    /// Remove a task, unlinking it from the pomodoro if needed.
    pub fn remove_task(&mut self, id: &str) -> Result<Task> {
        let task = self.tasks.remove(id)?;
        self.reconciler.save_tasks(&self.tasks)?;
        if self.pomodoro.linked_task_id() == Some(id) {
            self.pomodoro.unlink_task();
            self.reconciler.save_pomodoro(&self.pomodoro)?;
        }
        Ok(task)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Observe both countdowns; completions go to the backlog.
    fn settle(&mut self, now: DateTime<Utc>) -> Result<()> {
        if let Some(done) = self.timer.poll(now).completion {
            self.finish_timer(done, false)?;
        }
        let (_, phase_done) = self.pomodoro.poll(now, &self.plan);
        if let Some(done) = phase_done {
            self.finish_phase(done, false)?;
        }
        Ok(())
    }

    fn finish_timer(&mut self, done: Completion, replayed: bool) -> Result<()> {
        self.reconciler.save_timer(&self.timer)?;
        tracing::info!(finished_at = %done.finished_at, replayed, "timer finished");
        self.announce(
            NotificationKind::TimerFinished,
            "Timer finished".to_string(),
            format!("{} countdown is done", format_clock(done.total)),
            done.finished_at,
        );
        self.backlog.push(Event::CountdownCompleted {
            target: Target::Timer,
            total_ms: done.total.num_milliseconds(),
            finished_at: done.finished_at,
            replayed,
        });
        Ok(())
    }

    fn finish_phase(&mut self, done: PhaseCompletion, replayed: bool) -> Result<()> {
        self.reconciler.save_pomodoro(&self.pomodoro)?;
        tracing::info!(
            phase = %done.phase,
            next = %done.next_phase,
            cycle = done.next_cycle_index,
            replayed,
            "pomodoro phase finished"
        );

        self.backlog.push(Event::CountdownCompleted {
            target: Target::Pomodoro,
            total_ms: done.total.num_milliseconds(),
            finished_at: done.finished_at,
            replayed,
        });
        self.backlog.push(Event::PhaseChanged {
            from: done.phase,
            to: done.next_phase,
            cycle_index: done.next_cycle_index,
            at: done.finished_at,
        });
        if done.phase == Phase::Focus && done.focus_minutes > 0 {
            let credited = self.credit_focus(
                done.finished_at,
                done.focus_minutes,
                1,
                done.linked_task_id.clone(),
            )?;
            self.backlog.push(credited);
        }

        let title = match done.phase {
            Phase::Focus => "Focus complete",
            Phase::ShortBreak | Phase::LongBreak => "Break over",
        };
        self.announce(
            NotificationKind::PhaseFinished,
            title.to_string(),
            format!("Next up: {}", done.next_phase.label()),
            done.finished_at,
        );
        Ok(())
    }

    /// Credit the ledger on the local date of `at`, and the task if any.
    fn credit_focus(
        &mut self,
        at: DateTime<Utc>,
        minutes: u32,
        sessions: u32,
        task_id: Option<String>,
    ) -> Result<Event> {
        let date = self.clock.local(at).date();
        self.stats.record(date, minutes, sessions);
        self.reconciler.save_stats(&self.stats)?;

        if let Some(id) = task_id.as_deref() {
            if self.tasks.credit_focus(id, minutes) {
                self.reconciler.save_tasks(&self.tasks)?;
            } else {
                tracing::debug!(task_id = id, "linked task no longer exists");
            }
        }

        Ok(Event::FocusCredited {
            date,
            minutes,
            sessions,
            task_id,
            at,
        })
    }

    fn fire_alarms(&mut self, now: DateTime<Utc>) -> Result<()> {
        let Some(minute) = self.gate.admit(now) else {
            return Ok(());
        };
        let minute = self.clock.local(minute);

        let due: Vec<AlarmSchedule> = find_due(self.alarms.as_slice(), minute)
            .into_iter()
            .cloned()
            .collect();
        let mut disabled_any = false;
        for alarm in &due {
            let auto_disabled = alarm.is_one_shot();
            if auto_disabled {
                self.alarms.disable(alarm.id())?;
                disabled_any = true;
            }
            tracing::info!(id = alarm.id(), label = %alarm.label, %minute, "alarm fired");
            self.notifier.notify(&Notification {
                kind: NotificationKind::Alarm,
                title: alarm.label.clone(),
                body: format!("{} · {}", alarm.fire_time, alarm.repeat_label()),
                at: now,
            });
            self.play(&alarm.sound);
            self.backlog.push(Event::AlarmFired {
                alarm_id: alarm.id().to_string(),
                label: alarm.label.clone(),
                fire_time: alarm.fire_time,
                auto_disabled,
                at: now,
            });
        }

        if disabled_any {
            self.reconciler.save_alarms(&self.alarms)?;
        }
        self.reconciler.save_alarm_cursor(&self.gate)?;
        Ok(())
    }

    fn announce(&self, kind: NotificationKind, title: String, body: String, at: DateTime<Utc>) {
        self.notifier.notify(&Notification {
            kind,
            title,
            body,
            at,
        });
        self.play(&self.completion_sound);
    }

    fn play(&self, sound: &SoundRef) {
        if let Err(e) = self.sound.play(sound) {
            tracing::warn!(error = %e, ?sound, "sound playback failed");
        }
    }

    fn snapshot_at(&self, now: DateTime<Utc>, events: Vec<Event>) -> Snapshot {
        Snapshot {
            at: now,
            timer: CountdownView::of(&self.timer, now),
            pomodoro: PomodoroView::of(&self.pomodoro, &self.plan, now),
            events,
        }
    }
}

fn ignored(target: Target, rejected: CommandRejected, now: DateTime<Utc>) -> Event {
    tracing::debug!(?target, reason = %rejected, "command ignored");
    Event::CommandIgnored {
        target,
        reason: rejected.to_string(),
        at: now,
    }
}

/// `MM:SS`, or `H:MM:SS` from an hour up.
fn format_clock(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
