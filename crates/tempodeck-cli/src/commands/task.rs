use clap::{Subcommand, ValueEnum};
use tempodeck_core::{Priority, TaskSort, TaskTag};

use super::{open_deck, print_json, CliResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum SortBy {
    Date,
    Priority,
}

impl From<SortBy> for TaskSort {
    fn from(value: SortBy) -> Self {
        match value {
            SortBy::Date => TaskSort::Date,
            SortBy::Priority => TaskSort::Priority,
        }
    }
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task text
        text: String,
        /// high, medium or low
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// work, personal, shopping, health or other
        #[arg(long, default_value = "other")]
        tag: TaskTag,
    },
    /// List tasks, open ones first
    List {
        #[arg(long, value_enum, default_value = "date")]
        sort: SortBy,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a task done, or not done
    Toggle { id: String },
    /// Delete a task
    Remove { id: String },
}

pub fn run(action: TaskAction) -> CliResult {
    let mut deck = open_deck()?;

    match action {
        TaskAction::Add {
            text,
            priority,
            tag,
        } => {
            let task = deck.add_task(&text, priority, tag)?;
            print_json(&task)?;
        }
        TaskAction::List { sort, json } => {
            let tasks = deck.tasks().sorted(sort.into());
            if json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("No tasks.");
            } else {
                let linked = deck.pomodoro().linked_task_id();
                for task in tasks {
                    let mark = if task.completed { "x" } else { " " };
                    let focus = if linked == Some(task.id.as_str()) { " *" } else { "" };
                    println!(
                        "[{mark}] {}  {:<6} {:<8} {:>4}m  {}{focus}",
                        task.id,
                        format!("{:?}", task.priority),
                        task.tag,
                        task.time_spent_min,
                        task.text,
                    );
                }
                println!("{} open", deck.tasks().active_count());
            }
        }
        TaskAction::Toggle { id } => {
            let completed = deck.toggle_task(&id)?;
            print_json(&serde_json::json!({ "id": id, "completed": completed }))?;
        }
        TaskAction::Remove { id } => {
            let task = deck.remove_task(&id)?;
            print_json(&task)?;
        }
    }
    Ok(())
}
