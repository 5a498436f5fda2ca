pub mod alarm;
pub mod config;
pub mod poll;
pub mod pomodoro;
pub mod stats;
pub mod task;
pub mod timer;
pub mod watch;

use serde::Serialize;
use tempodeck_core::{Config, Deck, SqliteStore, SystemClock};

use crate::terminal::{TerminalBell, TerminalNotifier};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub type CliDeck = Deck<SystemClock, SqliteStore>;

/// Open the deck on the default database with terminal collaborators.
///
/// Completions missed since the last invocation are announced here.
pub fn open_deck() -> CliResult<CliDeck> {
    let config = Config::load_or_default();
    let store = SqliteStore::open_default()?;
    let deck = Deck::builder(SystemClock, store)
        .plan(config.pomodoro_plan())
        .notifier(TerminalNotifier::new(config.display.twenty_four_hour))
        .sound_player(TerminalBell::new(config.sound_settings()))
        .open()?;
    Ok(deck)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
