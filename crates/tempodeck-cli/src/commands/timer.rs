use chrono::Duration;
use clap::Subcommand;

use super::{open_deck, print_json, CliResult};
use crate::duration::parse_duration;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a countdown (90, 90s, 25m, 1h30m, 00:25:00)
    Start {
        #[arg(value_parser = parse_duration)]
        duration: Duration,
    },
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Reset to idle
    Reset,
    /// Print current timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> CliResult {
    let mut deck = open_deck()?;

    let event = match action {
        TimerAction::Start { duration } => deck.timer_start(duration)?,
        TimerAction::Pause => deck.timer_pause()?,
        TimerAction::Resume => deck.timer_resume()?,
        TimerAction::Reset => deck.timer_reset()?,
        TimerAction::Status => {
            let snapshot = deck.poll()?;
            print_json(&snapshot.timer)?;
            for event in &snapshot.events {
                print_json(event)?;
            }
            return Ok(());
        }
    };
    print_json(&event)
}
