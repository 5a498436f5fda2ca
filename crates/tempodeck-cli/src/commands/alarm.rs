use chrono::NaiveDate;
use clap::{Args, Subcommand};
use tempodeck_core::{AlarmDraft, Config, FireTime, Recurrence};

use super::{open_deck, print_json, CliResult};
use crate::duration::{parse_days, parse_sound};

#[derive(Args)]
pub struct AlarmSpec {
    /// Time of day, 24-hour HH:MM
    time: FireTime,
    /// Repeat days: daily, weekdays, weekends, or a list like mon,wed
    #[arg(long, conflicts_with = "date")]
    days: Option<String>,
    /// Fire once on this date (YYYY-MM-DD), then disable
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long, default_value = "")]
    label: String,
    /// Built-in sound (digital, chime, pulse) or a path to a sound file
    #[arg(long)]
    sound: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

impl AlarmSpec {
    fn into_draft(self) -> Result<AlarmDraft, String> {
        let recurrence = match (self.date, self.days) {
            (Some(date), _) => Recurrence::SpecificDate(date),
            (None, Some(days)) => parse_days(&days)?,
            (None, None) => Recurrence::Once,
        };
        let mut draft = AlarmDraft::new(self.time, recurrence).label(self.label);
        if let Some(sound) = self.sound {
            draft = draft.sound(parse_sound(&sound));
        }
        if let Some(color) = self.color {
            draft = draft.color(color);
        }
        Ok(draft)
    }
}

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Add an alarm
    Add(AlarmSpec),
    /// Replace an alarm's definition (re-enables it)
    Edit {
        id: String,
        #[command(flatten)]
        spec: AlarmSpec,
    },
    /// Enable or disable an alarm
    Toggle { id: String },
    /// Delete an alarm
    Remove { id: String },
    /// List alarms
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: AlarmAction) -> CliResult {
    let mut deck = open_deck()?;

    match action {
        AlarmAction::Add(spec) => {
            let alarm = deck.add_alarm(spec.into_draft()?)?;
            print_json(&alarm)?;
        }
        AlarmAction::Edit { id, spec } => {
            let alarm = deck.update_alarm(&id, spec.into_draft()?)?;
            print_json(&alarm)?;
        }
        AlarmAction::Toggle { id } => {
            let enabled = deck.toggle_alarm(&id)?;
            print_json(&serde_json::json!({ "id": id, "enabled": enabled }))?;
        }
        AlarmAction::Remove { id } => {
            let alarm = deck.remove_alarm(&id)?;
            print_json(&alarm)?;
        }
        AlarmAction::List { json } => {
            let alarms = deck.alarms().as_slice();
            if json {
                print_json(alarms)?;
            } else if alarms.is_empty() {
                println!("No alarms.");
            } else {
                let twenty_four_hour = Config::load_or_default().display.twenty_four_hour;
                for alarm in alarms {
                    let time = if twenty_four_hour {
                        alarm.fire_time.to_string()
                    } else {
                        alarm.fire_time.to_12h_string()
                    };
                    let state = if alarm.enabled { "on " } else { "off" };
                    println!(
                        "{}  {:>8}  {state}  {:<12}  {}",
                        alarm.id(),
                        time,
                        alarm.repeat_label(),
                        alarm.label
                    );
                }
            }
        }
    }
    Ok(())
}
