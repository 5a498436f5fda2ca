//! Task list.
//!
//! Deliberately small: tasks exist so a pomodoro run can be linked to one
//! and credit it with focus time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            _ => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("unknown priority '{s}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskTag {
    Work,
    Personal,
    Shopping,
    Health,
    #[default]
    Other,
}

impl fmt::Display for TaskTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskTag::Work => "Work",
            TaskTag::Personal => "Personal",
            TaskTag::Shopping => "Shopping",
            TaskTag::Health => "Health",
            TaskTag::Other => "Other",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(TaskTag::Work),
            "personal" => Ok(TaskTag::Personal),
            "shopping" => Ok(TaskTag::Shopping),
            "health" => Ok(TaskTag::Health),
            "other" => Ok(TaskTag::Other),
            _ => Err(ValidationError::InvalidValue {
                field: "tag".into(),
                message: format!("unknown tag '{s}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tag: TaskTag,
    pub created_at: DateTime<Utc>,
    /// Accumulated focus minutes.
    #[serde(default)]
    pub time_spent_min: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSort {
    #[default]
    Date,
    Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn add(
        &mut self,
        text: &str,
        priority: Priority,
        tag: TaskTag,
        now: DateTime<Utc>,
    ) -> Result<&Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty("task text").into());
        }
        self.tasks.insert(
            0,
            Task {
                id: Uuid::new_v4().to_string(),
                text: text.to_string(),
                completed: false,
                priority,
                tag,
                created_at: now,
                time_spent_min: 0,
            },
        );
        Ok(&self.tasks[0])
    }

    /// Flip `completed`; returns the new value.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let task = self.find_mut(id)?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn remove(&mut self, id: &str) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::not_found("task", id))?;
        Ok(self.tasks.remove(idx))
    }

    /// Add focus minutes to a task. Returns false if it no longer exists.
    pub fn credit_focus(&mut self, id: &str, minutes: u32) -> bool {
        match self.find_mut(id) {
            Ok(task) => {
                task.time_spent_min = task.time_spent_min.saturating_add(minutes);
                true
            }
            Err(_) => false,
        }
    }

    /// Incomplete tasks first, then by priority (if requested), then newest.
    pub fn sorted(&self, sort: TaskSort) -> Vec<&Task> {
        let mut out: Vec<&Task> = self.tasks.iter().collect();
        out.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then_with(|| match sort {
                    TaskSort::Priority => b.priority.weight().cmp(&a.priority.weight()),
                    TaskSort::Date => std::cmp::Ordering::Equal,
                })
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        out
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CoreError::not_found("task", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_740_000_000, 0).unwrap()
    }

    #[test]
    fn add_rejects_blank_text() {
        let mut list = TaskList::new();
        assert!(list.add("   ", Priority::High, TaskTag::Work, t0()).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn sort_puts_completed_last_and_respects_priority() {
        let mut list = TaskList::new();
        let low = list
            .add("low", Priority::Low, TaskTag::Other, t0())
            .unwrap()
            .id
            .clone();
        let high = list
            .add("high", Priority::High, TaskTag::Work, t0() + Duration::seconds(1))
            .unwrap()
            .id
            .clone();
        let done = list
            .add("done", Priority::High, TaskTag::Work, t0() + Duration::seconds(2))
            .unwrap()
            .id
            .clone();
        let newest = list
            .add("newest", Priority::Medium, TaskTag::Health, t0() + Duration::seconds(3))
            .unwrap()
            .id
            .clone();
        list.toggle(&done).unwrap();

        let by_date: Vec<_> = list.sorted(TaskSort::Date).iter().map(|t| t.id.clone()).collect();
        assert_eq!(by_date, vec![newest.clone(), high.clone(), low.clone(), done.clone()]);

        let by_priority: Vec<_> = list
            .sorted(TaskSort::Priority)
            .iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(by_priority, vec![high, newest, low, done]);
        assert_eq!(list.active_count(), 3);
    }

    #[test]
    fn credit_focus_accumulates() {
        let mut list = TaskList::new();
        let id = list
            .add("write report", Priority::Medium, TaskTag::Work, t0())
            .unwrap()
            .id
            .clone();
        assert!(list.credit_focus(&id, 25));
        assert!(list.credit_focus(&id, 1));
        assert_eq!(list.get(&id).unwrap().time_spent_min, 26);
        assert!(!list.credit_focus("gone", 5));
    }
}
