use clap::Subcommand;
use tempodeck_core::Phase;

use super::{open_deck, print_json, CliResult};

#[derive(Subcommand)]
pub enum PomodoroAction {
    /// Start the current phase (continues it if paused)
    Start,
    /// Pause the running phase
    Pause,
    /// Resume a paused phase
    Resume,
    /// Restart the current phase from the top
    Reset,
    /// Move to the next phase without credit
    Skip,
    /// Stop focusing early, crediting whole elapsed minutes
    Abandon,
    /// Switch to a phase: focus, short-break or long-break
    Phase { phase: Phase },
    /// Credit focus time to a task
    Link { task_id: String },
    /// Stop crediting a task
    Unlink,
    /// Print current session state as JSON
    Status,
}

pub fn run(action: PomodoroAction) -> CliResult {
    let mut deck = open_deck()?;

    let event = match action {
        PomodoroAction::Start => deck.pomodoro_start()?,
        PomodoroAction::Pause => deck.pomodoro_pause()?,
        PomodoroAction::Resume => deck.pomodoro_resume()?,
        PomodoroAction::Reset => deck.pomodoro_reset()?,
        PomodoroAction::Skip => deck.pomodoro_skip()?,
        PomodoroAction::Abandon => deck.pomodoro_abandon()?,
        PomodoroAction::Phase { phase } => deck.pomodoro_switch_phase(phase)?,
        PomodoroAction::Link { task_id } => deck.pomodoro_link_task(&task_id)?,
        PomodoroAction::Unlink => deck.pomodoro_unlink_task()?,
        PomodoroAction::Status => {
            let snapshot = deck.poll()?;
            print_json(&snapshot.pomodoro)?;
            for event in &snapshot.events {
                print_json(event)?;
            }
            return Ok(());
        }
    };
    print_json(&event)
}
