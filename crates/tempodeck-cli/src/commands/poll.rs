use super::{open_deck, print_json, CliResult};

pub fn run() -> CliResult {
    let mut deck = open_deck()?;
    let snapshot = deck.poll()?;
    print_json(&snapshot)
}
