//! Alarm records and the alarm book that owns them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Built-in alarm sounds: `(id, display name)`.
pub const BUILT_IN_SOUNDS: [(&str, &str); 3] = [
    ("digital", "Digital"),
    ("chime", "Soft Chime"),
    ("pulse", "Deep Pulse"),
];

/// Local time of day, always held in 24-hour form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FireTime {
    hour: u8,
    minute: u8,
}

impl FireTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Whether `at` falls on this hour and minute.
    pub fn matches(&self, at: &NaiveDateTime) -> bool {
        at.hour() == u32::from(self.hour) && at.minute() == u32::from(self.minute)
    }

    /// `7:05 AM` style rendering for 12-hour displays.
    pub fn to_12h_string(&self) -> String {
        let suffix = if self.hour < 12 { "AM" } else { "PM" };
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{hour}:{:02} {suffix}", self.minute)
    }
}

impl fmt::Display for FireTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for FireTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for FireTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FireTime> for String {
    fn from(value: FireTime) -> Self {
        value.to_string()
    }
}

/// On which days an alarm is eligible to fire.
///
/// The enum shape guarantees a specific date never also carries weekdays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Recurrence {
    /// Weekday indices, 0 = Sunday.
    Weekly(BTreeSet<u8>),
    SpecificDate(NaiveDate),
    /// No date and no weekdays. Fires every day at its time until disabled.
    Once,
}

impl Recurrence {
    /// Weekly recurrence on the given day indices. An empty set is `Once`.
    pub fn weekly(days: impl IntoIterator<Item = u8>) -> Result<Self, ValidationError> {
        let days: BTreeSet<u8> = days.into_iter().collect();
        if let Some(bad) = days.iter().find(|d| **d > 6) {
            return Err(ValidationError::InvalidWeekday(*bad));
        }
        if days.is_empty() {
            return Ok(Recurrence::Once);
        }
        Ok(Recurrence::Weekly(days))
    }

    pub fn daily() -> Self {
        Recurrence::Weekly((0..=6).collect())
    }

    pub fn weekdays() -> Self {
        Recurrence::Weekly((1..=5).collect())
    }

    pub fn weekends() -> Self {
        Recurrence::Weekly([0, 6].into_iter().collect())
    }

    /// Short human label: `Daily`, `Weekdays`, `Mar 1`, `Mon, Wed`...
    pub fn label(&self) -> String {
        match self {
            Recurrence::SpecificDate(date) => date.format("%b %-d").to_string(),
            Recurrence::Once => "Once".to_string(),
            Recurrence::Weekly(days) => {
                if days.is_empty() {
                    return "Once".to_string();
                }
                if *self == Self::daily() {
                    return "Daily".to_string();
                }
                if *self == Self::weekdays() {
                    return "Weekdays".to_string();
                }
                if *self == Self::weekends() {
                    return "Weekends".to_string();
                }
                days.iter()
                    .filter_map(|d| DAY_NAMES.get(usize::from(*d)))
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
    }
}

/// Which sound an alarm plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoundRef {
    BuiltIn { id: String },
    /// User-supplied sound; `uri` is whatever the sound player understands.
    Custom { name: String, uri: String },
}

impl SoundRef {
    pub fn built_in(id: impl Into<String>) -> Self {
        SoundRef::BuiltIn { id: id.into() }
    }
}

impl Default for SoundRef {
    fn default() -> Self {
        SoundRef::built_in("digital")
    }
}

/// A single alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSchedule {
    id: String,
    pub fire_time: FireTime,
    pub recurrence: Recurrence,
    pub enabled: bool,
    #[serde(default)]
    pub sound: SoundRef,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl AlarmSchedule {
    pub fn new(draft: AlarmDraft) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), draft)
    }

    fn with_id(id: String, draft: AlarmDraft) -> Self {
        let label = match draft.label.trim() {
            "" => "Alarm".to_string(),
            l => l.to_string(),
        };
        Self {
            id,
            fire_time: draft.fire_time,
            recurrence: draft.recurrence,
            enabled: true,
            sound: draft.sound,
            label,
            color: draft.color,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `Daily`, `Weekdays`, `Mon, Wed`, `Mar 1`...
    pub fn repeat_label(&self) -> String {
        self.recurrence.label()
    }

    pub fn is_one_shot(&self) -> bool {
        matches!(self.recurrence, Recurrence::SpecificDate(_))
    }
}

/// User input for creating or editing an alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmDraft {
    pub fire_time: FireTime,
    pub recurrence: Recurrence,
    pub sound: SoundRef,
    pub label: String,
    pub color: Option<String>,
}

impl AlarmDraft {
    pub fn new(fire_time: FireTime, recurrence: Recurrence) -> Self {
        Self {
            fire_time,
            recurrence,
            sound: SoundRef::default(),
            label: String::new(),
            color: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn sound(mut self, sound: SoundRef) -> Self {
        self.sound = sound;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Ordered alarm list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmBook {
    alarms: Vec<AlarmSchedule>,
}

impl AlarmBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[AlarmSchedule] {
        &self.alarms
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AlarmSchedule> {
        self.alarms.iter().find(|a| a.id == id)
    }

    pub fn add(&mut self, draft: AlarmDraft) -> &AlarmSchedule {
        self.alarms.push(AlarmSchedule::new(draft));
        &self.alarms[self.alarms.len() - 1]
    }

    /// Replace an alarm's definition. Editing re-enables it.
    pub fn update(&mut self, id: &str, draft: AlarmDraft) -> Result<&AlarmSchedule> {
        let slot = self.find_mut(id)?;
        *slot = AlarmSchedule::with_id(id.to_string(), draft);
        Ok(slot)
    }

    /// Flip `enabled`; returns the new value.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let alarm = self.find_mut(id)?;
        alarm.enabled = !alarm.enabled;
        Ok(alarm.enabled)
    }

    pub fn disable(&mut self, id: &str) -> Result<()> {
        self.find_mut(id)?.enabled = false;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<AlarmSchedule> {
        let idx = self
            .alarms
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CoreError::not_found("alarm", id))?;
        Ok(self.alarms.remove(idx))
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut AlarmSchedule> {
        self.alarms
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::not_found("alarm", id))
    }
}
