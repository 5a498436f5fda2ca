//! End-to-end behaviour of the deck across polls, suspensions and reopens.
//!
//! Suspension is modelled by moving a `ManualClock` forward and, where the
//! process would have been killed, by reopening a fresh deck on the same
//! store.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use tempodeck_core::{
    AlarmDraft, Clock, CountdownStatus, Deck, DurableStore, Event, FireTime, ManualClock, MemoryStore,
    Notification, NotificationKind, Notifier, Phase, Priority, Recurrence, SoundError,
    SoundPlayer, SoundRef, SqliteStore, Target, TaskTag,
};

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Notification>>>);

impl Recorder {
    fn kinds(&self) -> Vec<NotificationKind> {
        self.0.borrow().iter().map(|n| n.kind).collect()
    }
}

impl Notifier for Recorder {
    fn notify(&self, notification: &Notification) {
        self.0.borrow_mut().push(notification.clone());
    }
}

#[derive(Clone, Default)]
struct BrokenSpeaker(Rc<RefCell<u32>>);

impl SoundPlayer for BrokenSpeaker {
    fn play(&self, _sound: &SoundRef) -> Result<(), SoundError> {
        *self.0.borrow_mut() += 1;
        Err(SoundError::Unavailable("no audio device".into()))
    }
}

/// Wednesday.
fn wednesday(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 4, h, m, s).unwrap()
}

fn fired_alarms(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::AlarmFired { label, .. } => Some(label.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Countdown timer
// ============================================================================

#[test]
fn start_then_poll_reports_remaining() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();

    deck.timer_start(Duration::seconds(90)).unwrap();
    clock.advance(Duration::seconds(30));
    let snap = deck.poll().unwrap();
    assert_eq!(snap.timer.status, CountdownStatus::Running);
    assert_eq!(snap.timer.remaining_ms, 60_000);
}

#[test]
fn suspended_timer_completes_on_reopen_exactly_once() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.timer_start(Duration::seconds(10)).unwrap();
    let store = deck.into_store();

    // Eight hours pass with nobody polling.
    clock.advance(Duration::hours(8));
    let recorder = Recorder::default();
    let mut deck = Deck::builder(&clock, store)
        .notifier(recorder.clone())
        .open()
        .unwrap();
    assert_eq!(recorder.kinds(), vec![NotificationKind::TimerFinished]);

    let snap = deck.poll().unwrap();
    assert_eq!(snap.timer.status, CountdownStatus::Completed);
    assert_eq!(snap.timer.remaining_ms, 0);
    match snap.events.as_slice() {
        [Event::CountdownCompleted {
            target: Target::Timer,
            finished_at,
            replayed: true,
            ..
        }] => assert_eq!(*finished_at, wednesday(9, 0, 10)),
        other => panic!("expected one replayed completion, got {other:?}"),
    }

    // A second reopen has nothing left to replay.
    let store = deck.into_store();
    let again = Recorder::default();
    let mut deck = Deck::builder(&clock, store)
        .notifier(again.clone())
        .open()
        .unwrap();
    assert!(deck.poll().unwrap().events.is_empty());
    assert!(again.kinds().is_empty());
}

#[test]
fn running_timer_survives_reopen_with_same_deadline() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.timer_start(Duration::minutes(10)).unwrap();
    let store = deck.into_store();

    clock.advance(Duration::minutes(4));
    let mut deck = Deck::builder(&clock, store).open().unwrap();
    let snap = deck.poll().unwrap();
    assert_eq!(snap.timer.status, CountdownStatus::Running);
    assert_eq!(snap.timer.deadline, Some(wednesday(9, 10, 0)));
    assert_eq!(snap.timer.remaining_ms, Duration::minutes(6).num_milliseconds());
}

#[test]
fn pause_holds_remaining_across_reopen() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.timer_start(Duration::seconds(100)).unwrap();
    clock.advance(Duration::seconds(40));
    deck.timer_pause().unwrap();
    let store = deck.into_store();

    clock.advance(Duration::days(2));
    let mut deck = Deck::builder(&clock, store).open().unwrap();
    assert_eq!(deck.poll().unwrap().timer.remaining_ms, 60_000);

    deck.timer_resume().unwrap();
    clock.advance(Duration::seconds(60));
    let snap = deck.poll().unwrap();
    assert_eq!(snap.timer.status, CountdownStatus::Completed);
    assert_eq!(snap.events.len(), 1);
}

#[test]
fn reset_discards_persisted_timer() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.timer_start(Duration::seconds(10)).unwrap();
    deck.timer_reset().unwrap();
    let store = deck.into_store();
    assert!(store.get("timer").unwrap().is_none());
}

#[test]
fn corrupt_timer_record_heals_to_idle() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut store = SqliteStore::open_memory().unwrap();
    store.put("timer", br#"{"status":"running"}"#).unwrap();
    store.put("tasks", b"\xff\xfe").unwrap();

    let mut deck = Deck::builder(&clock, store).open().unwrap();
    let snap = deck.poll().unwrap();
    assert_eq!(snap.timer.status, CountdownStatus::Idle);
    assert!(snap.events.is_empty());
    assert!(deck.tasks().is_empty());
}

#[test]
fn overlong_paused_record_heals_and_resume_is_ignored() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut store = MemoryStore::new();
    store
        .put(
            "timer",
            br#"{"status":"paused","remaining_ms":9000000000000000000,"total_ms":9000000000000000000}"#,
        )
        .unwrap();

    let mut deck = Deck::builder(&clock, store).open().unwrap();
    assert_eq!(deck.timer().status(), CountdownStatus::Idle);
    assert!(matches!(
        deck.timer_resume().unwrap(),
        Event::CommandIgnored { .. }
    ));
}

#[test]
fn overlong_timer_start_is_ignored() {
    let clock = ManualClock::new(wednesday(9, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    let event = deck
        .timer_start(Duration::seconds(9_000_000_000_000))
        .unwrap();
    assert!(matches!(event, Event::CommandIgnored { .. }));
    assert_eq!(deck.poll().unwrap().timer.status, CountdownStatus::Idle);
    assert!(deck.into_store().get("timer").unwrap().is_none());
}

#[test]
fn sqlite_store_on_disk_carries_timer_between_processes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tempodeck.db");
    let clock = ManualClock::new(wednesday(9, 0, 0));

    {
        let mut deck = Deck::builder(&clock, SqliteStore::open(&path).unwrap())
            .open()
            .unwrap();
        deck.timer_start(Duration::minutes(5)).unwrap();
    }

    clock.advance(Duration::minutes(6));
    let mut deck = Deck::builder(&clock, SqliteStore::open(&path).unwrap())
        .open()
        .unwrap();
    let snap = deck.poll().unwrap();
    assert_eq!(snap.timer.status, CountdownStatus::Completed);
    assert!(matches!(
        snap.events.as_slice(),
        [Event::CountdownCompleted { replayed: true, .. }]
    ));
}

// ============================================================================
// Alarms
// ============================================================================

#[test]
fn weekly_alarm_fires_on_listed_day_only() {
    let clock = ManualClock::new(wednesday(6, 59, 30));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.add_alarm(
        AlarmDraft::new(FireTime::new(7, 0).unwrap(), Recurrence::weekly([3]).unwrap())
            .label("Wednesday standup"),
    )
    .unwrap();

    assert!(fired_alarms(&deck.poll().unwrap().events).is_empty());

    clock.set(wednesday(7, 0, 5));
    assert_eq!(
        fired_alarms(&deck.poll().unwrap().events),
        vec!["Wednesday standup".to_string()]
    );

    // Same minute, later second: not again.
    clock.set(wednesday(7, 0, 40));
    assert!(fired_alarms(&deck.poll().unwrap().events).is_empty());

    // Thursday at the same time.
    clock.set(wednesday(7, 0, 5) + Duration::days(1));
    assert!(fired_alarms(&deck.poll().unwrap().events).is_empty());
    assert!(deck.alarms().as_slice()[0].enabled);
}

#[test]
fn alarm_minute_is_not_refired_by_a_new_process() {
    let clock = ManualClock::new(wednesday(7, 0, 5));
    let recorder = Recorder::default();
    let mut deck = Deck::builder(&clock, MemoryStore::new())
        .notifier(recorder.clone())
        .open()
        .unwrap();
    deck.add_alarm(AlarmDraft::new(
        FireTime::new(7, 0).unwrap(),
        Recurrence::daily(),
    ))
    .unwrap();
    assert_eq!(fired_alarms(&deck.poll().unwrap().events).len(), 1);
    let store = deck.into_store();

    clock.set(wednesday(7, 0, 50));
    let mut deck = Deck::builder(&clock, store)
        .notifier(recorder.clone())
        .open()
        .unwrap();
    assert!(fired_alarms(&deck.poll().unwrap().events).is_empty());
    assert_eq!(recorder.kinds(), vec![NotificationKind::Alarm]);
}

#[test]
fn specific_date_alarm_fires_once_and_disables() {
    let clock = ManualClock::new(wednesday(8, 30, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    let alarm = deck
        .add_alarm(
            AlarmDraft::new(
                FireTime::new(8, 30).unwrap(),
                Recurrence::SpecificDate(NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()),
            )
            .label("Dentist"),
        )
        .unwrap();

    let events = deck.poll().unwrap().events;
    assert!(matches!(
        events.as_slice(),
        [Event::AlarmFired { auto_disabled: true, .. }]
    ));
    let store = deck.into_store();

    // Disabled state was persisted.
    clock.set(wednesday(8, 30, 0) + Duration::days(7));
    let mut deck = Deck::builder(&clock, store).open().unwrap();
    assert!(!deck.alarms().get(alarm.id()).unwrap().enabled);
    assert!(fired_alarms(&deck.poll().unwrap().events).is_empty());
}

#[test]
fn alarms_sharing_a_time_all_fire() {
    let clock = ManualClock::new(wednesday(12, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    let noon = FireTime::new(12, 0).unwrap();
    deck.add_alarm(AlarmDraft::new(noon, Recurrence::Once).label("lunch"))
        .unwrap();
    deck.add_alarm(AlarmDraft::new(noon, Recurrence::weekdays()).label("meds"))
        .unwrap();
    assert_eq!(
        fired_alarms(&deck.poll().unwrap().events),
        vec!["lunch".to_string(), "meds".to_string()]
    );
}

#[test]
fn alarm_matches_local_time_not_utc() {
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    // 22:15 UTC Wednesday is 07:15 Thursday in Tokyo.
    let clock = ManualClock::with_offset(wednesday(22, 15, 0), tokyo);
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.add_alarm(
        AlarmDraft::new(FireTime::new(7, 15).unwrap(), Recurrence::weekly([4]).unwrap())
            .label("thursday"),
    )
    .unwrap();
    assert_eq!(fired_alarms(&deck.poll().unwrap().events).len(), 1);
}

#[test]
fn alarm_fires_after_moving_west() {
    let clock = ManualClock::new(wednesday(12, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.add_alarm(AlarmDraft::new(FireTime::new(9, 1).unwrap(), Recurrence::daily()).label("west"))
        .unwrap();
    assert!(fired_alarms(&deck.poll().unwrap().events).is_empty());
    let store = deck.into_store();

    // One minute later in UTC, but local time is now 09:01.
    let west = FixedOffset::west_opt(3 * 3600).unwrap();
    let moved = ManualClock::with_offset(wednesday(12, 1, 0), west);
    let mut deck = Deck::builder(&moved, store).open().unwrap();
    assert_eq!(
        fired_alarms(&deck.poll().unwrap().events),
        vec!["west".to_string()]
    );

    moved.set(wednesday(12, 1, 30));
    assert!(fired_alarms(&deck.poll().unwrap().events).is_empty());
}

#[test]
fn sound_failures_are_swallowed() {
    let clock = ManualClock::new(wednesday(7, 0, 0));
    let speaker = BrokenSpeaker::default();
    let mut deck = Deck::builder(&clock, MemoryStore::new())
        .sound_player(speaker.clone())
        .open()
        .unwrap();
    deck.add_alarm(AlarmDraft::new(FireTime::new(7, 0).unwrap(), Recurrence::daily()))
        .unwrap();
    let events = deck.poll().unwrap().events;
    assert_eq!(fired_alarms(&events).len(), 1);
    assert_eq!(*speaker.0.borrow(), 1);
}

// ============================================================================
// Pomodoro
// ============================================================================

#[test]
fn finished_focus_credits_stats_and_linked_task() {
    let clock = ManualClock::new(wednesday(10, 0, 0));
    let recorder = Recorder::default();
    let mut deck = Deck::builder(&clock, MemoryStore::new())
        .notifier(recorder.clone())
        .open()
        .unwrap();
    let task = deck
        .add_task("draft proposal", Priority::High, TaskTag::Work)
        .unwrap();
    deck.pomodoro_link_task(&task.id).unwrap();
    deck.pomodoro_start().unwrap();

    clock.advance(Duration::minutes(25));
    let snap = deck.poll().unwrap();
    assert_eq!(snap.pomodoro.phase, Phase::ShortBreak);
    assert_eq!(snap.pomodoro.countdown.status, CountdownStatus::Completed);
    assert!(snap.events.iter().any(|e| matches!(
        e,
        Event::PhaseChanged { from: Phase::Focus, to: Phase::ShortBreak, .. }
    )));
    assert!(snap.events.iter().any(|e| matches!(
        e,
        Event::FocusCredited { minutes: 25, sessions: 1, .. }
    )));

    let today = deck.stats().day(NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()).unwrap();
    assert_eq!((today.minutes, today.sessions), (25, 1));
    assert_eq!(deck.tasks().get(&task.id).unwrap().time_spent_min, 25);
    assert_eq!(recorder.kinds(), vec![NotificationKind::PhaseFinished]);
}

#[test]
fn four_focus_runs_lead_to_long_break() {
    let clock = ManualClock::new(wednesday(8, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();

    let mut phases = Vec::new();
    for _ in 0..8 {
        deck.pomodoro_start().unwrap();
        let remaining = deck.pomodoro().countdown().remaining(clock.now());
        clock.advance(remaining);
        let snap = deck.poll().unwrap();
        phases.push((snap.pomodoro.phase, snap.pomodoro.cycle_index));
    }
    assert_eq!(
        phases,
        vec![
            (Phase::ShortBreak, 1),
            (Phase::Focus, 2),
            (Phase::ShortBreak, 2),
            (Phase::Focus, 3),
            (Phase::ShortBreak, 3),
            (Phase::Focus, 4),
            (Phase::LongBreak, 4),
            (Phase::Focus, 1),
        ]
    );
    let total: u64 = deck.stats().total_sessions();
    assert_eq!(total, 4);
}

#[test]
fn suspended_focus_is_credited_on_reopen() {
    let clock = ManualClock::new(wednesday(13, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.pomodoro_start().unwrap();
    let store = deck.into_store();

    clock.advance(Duration::hours(3));
    let mut deck = Deck::builder(&clock, store).open().unwrap();
    let events = deck.poll().unwrap().events;
    assert!(events.iter().any(|e| matches!(
        e,
        Event::CountdownCompleted { target: Target::Pomodoro, replayed: true, .. }
    )));
    assert_eq!(deck.stats().total_minutes(), 25);
    assert_eq!(deck.pomodoro().phase(), Phase::ShortBreak);
}

#[test]
fn abandon_credits_whole_elapsed_minutes() {
    let clock = ManualClock::new(wednesday(14, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.pomodoro_start().unwrap();
    clock.advance(Duration::seconds(90));

    let event = deck.pomodoro_abandon().unwrap();
    assert!(matches!(event, Event::FocusCredited { minutes: 1, sessions: 0, .. }));
    assert_eq!(deck.pomodoro().countdown().status(), CountdownStatus::Idle);
    assert_eq!(deck.pomodoro().phase(), Phase::Focus);

    let day = deck.stats().day(NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()).unwrap();
    assert_eq!((day.minutes, day.sessions), (1, 0));
}

#[test]
fn abandon_under_a_minute_credits_nothing() {
    let clock = ManualClock::new(wednesday(14, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.pomodoro_start().unwrap();
    clock.advance(Duration::seconds(59));

    assert!(matches!(
        deck.pomodoro_abandon().unwrap(),
        Event::FocusTooShort { .. }
    ));
    assert!(deck.stats().days().is_empty());
}

#[test]
fn abandon_during_break_is_ignored() {
    let clock = ManualClock::new(wednesday(14, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.pomodoro_switch_phase(Phase::ShortBreak).unwrap();
    deck.pomodoro_start().unwrap();
    assert!(matches!(
        deck.pomodoro_abandon().unwrap(),
        Event::CommandIgnored { target: Target::Pomodoro, .. }
    ));
    assert_eq!(deck.pomodoro().countdown().status(), CountdownStatus::Running);
}

#[test]
fn focus_is_credited_to_local_date() {
    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    // Finishes at 15:10 UTC, which is already Thursday in Tokyo.
    let clock = ManualClock::with_offset(wednesday(14, 45, 0), tokyo);
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.pomodoro_start().unwrap();
    clock.advance(Duration::minutes(25));
    deck.poll().unwrap();

    let thursday = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
    assert_eq!(deck.stats().day(thursday).map(|d| d.minutes), Some(25));
}

#[test]
fn skip_moves_on_without_credit() {
    let clock = ManualClock::new(wednesday(15, 0, 0));
    let mut deck = Deck::builder(&clock, MemoryStore::new()).open().unwrap();
    deck.pomodoro_start().unwrap();
    let event = deck.pomodoro_skip().unwrap();
    assert!(matches!(
        event,
        Event::PhaseChanged { from: Phase::Focus, to: Phase::ShortBreak, .. }
    ));
    assert!(deck.stats().days().is_empty());
    assert_eq!(deck.pomodoro().countdown().status(), CountdownStatus::Idle);
}
