//! Terminal collaborators: notifications on stderr and the terminal bell.

use std::io::Write;

use chrono::Local;
use tempodeck_core::{
    Notification, Notifier, SoundError, SoundPlayer, SoundRef, SoundSettings, BUILT_IN_SOUNDS,
};

/// Prints notifications to stderr so stdout stays machine-readable.
pub struct TerminalNotifier {
    twenty_four_hour: bool,
}

impl TerminalNotifier {
    pub fn new(twenty_four_hour: bool) -> Self {
        Self { twenty_four_hour }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        let local = notification.at.with_timezone(&Local);
        let stamp = if self.twenty_four_hour {
            local.format("%H:%M")
        } else {
            local.format("%-I:%M %p")
        };
        eprintln!("[{stamp}] {}: {}", notification.title, notification.body);
    }
}

/// Rings the terminal bell. Volume only decides between bell and silence.
pub struct TerminalBell {
    settings: SoundSettings,
}

impl TerminalBell {
    pub fn new(settings: SoundSettings) -> Self {
        Self { settings }
    }
}

impl SoundPlayer for TerminalBell {
    fn play(&self, sound: &SoundRef) -> Result<(), SoundError> {
        if let SoundRef::BuiltIn { id } = sound {
            if !BUILT_IN_SOUNDS.iter().any(|(known, _)| known == id) {
                return Err(SoundError::UnknownSound(id.clone()));
            }
        }
        if !self.settings.is_audible() {
            return Ok(());
        }
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}
