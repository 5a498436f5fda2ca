use std::time::Duration;

use clap::Args;
use tempodeck_core::{Config, CountdownStatus, Snapshot};

use super::{open_deck, CliResult};
use crate::duration::format_ms;

#[derive(Args)]
pub struct WatchArgs {
    /// Poll interval in milliseconds (defaults to watch.poll_interval_ms)
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Stop after this many polls
    #[arg(long)]
    iterations: Option<u64>,
    /// Also print a status line to stderr on every poll
    #[arg(long)]
    status: bool,
}

/// The periodic poll source. Events go to stdout as JSON lines.
pub fn run(args: WatchArgs) -> CliResult {
    let interval_ms = args
        .interval_ms
        .unwrap_or_else(|| Config::load_or_default().watch.poll_interval_ms)
        .max(10);
    let interval = Duration::from_millis(interval_ms);
    let mut deck = open_deck()?;
    tracing::debug!(interval_ms, "watch loop started");

    let mut polls = 0u64;
    loop {
        let snapshot = deck.poll()?;
        for event in &snapshot.events {
            println!("{}", serde_json::to_string(event)?);
        }
        if args.status {
            eprintln!("{}", status_line(&snapshot));
        }

        polls += 1;
        if args.iterations.is_some_and(|n| polls >= n) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn status_line(snapshot: &Snapshot) -> String {
    let timer = match snapshot.timer.status {
        CountdownStatus::Idle => "idle".to_string(),
        status => format!("{} {status}", format_ms(snapshot.timer.remaining_ms)),
    };
    let pomodoro = &snapshot.pomodoro;
    format!(
        "timer {timer} | {} {}/{} {} {}",
        pomodoro.phase,
        pomodoro.cycle_index,
        pomodoro.cycles_before_long_break,
        format_ms(pomodoro.countdown.remaining_ms),
        pomodoro.countdown.status
    )
}
