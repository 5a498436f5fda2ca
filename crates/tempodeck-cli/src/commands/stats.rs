use clap::Args;

use super::{open_deck, print_json, CliResult};

#[derive(Args)]
pub struct StatsArgs {
    /// Show the last N recorded days
    #[arg(long, default_value_t = 7)]
    days: usize,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: StatsArgs) -> CliResult {
    let deck = open_deck()?;
    let ledger = deck.stats();
    let days = ledger.days();
    let recent = &days[days.len().saturating_sub(args.days)..];

    if args.json {
        return print_json(&serde_json::json!({
            "days": recent,
            "total_minutes": ledger.total_minutes(),
            "total_sessions": ledger.total_sessions(),
        }));
    }

    if recent.is_empty() {
        println!("No focus recorded yet.");
        return Ok(());
    }
    for day in recent {
        println!(
            "{}  {:>4} min  {:>2} session{}",
            day.date,
            day.minutes,
            day.sessions,
            if day.sessions == 1 { "" } else { "s" }
        );
    }
    println!(
        "total: {} min in {} sessions over {} days",
        ledger.total_minutes(),
        ledger.total_sessions(),
        days.len()
    );
    Ok(())
}
