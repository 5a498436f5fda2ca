mod matcher;
mod schedule;

pub use matcher::{find_due, is_due, truncate_to_minute, MinuteGate};
pub use schedule::{
    AlarmBook, AlarmDraft, AlarmSchedule, FireTime, Recurrence, SoundRef, BUILT_IN_SOUNDS,
};
