//! Collaborator seams for user-facing side effects.
//!
//! Delivery mechanics (desktop toasts, terminal bells, audio) live behind
//! these traits. The engine calls [`Notifier::notify`] exactly once per
//! completion or alarm firing, and [`SoundPlayer::play`] at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alarm::SoundRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TimerFinished,
    PhaseFinished,
    Alarm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

pub trait Notifier {
    fn notify(&self, notification: &Notification);
}

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("unknown sound '{0}'")]
    UnknownSound(String),

    #[error("sound output unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fire-and-forget playback. Failures are logged by the caller and
/// otherwise ignored.
pub trait SoundPlayer {
    fn play(&self, sound: &SoundRef) -> Result<(), SoundError>;
}

/// Sound preferences handed to a player when it is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundSettings {
    pub enabled: bool,
    /// Clamped to 0.0..=1.0.
    pub volume: f64,
}

impl SoundSettings {
    pub fn new(enabled: bool, volume: f64) -> Self {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { enabled, volume }
    }

    pub fn is_audible(&self) -> bool {
        self.enabled && self.volume > 0.0
    }
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self::new(true, 1.0)
    }
}

/// Notifier that writes to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(
            kind = ?notification.kind,
            "{}: {}",
            notification.title,
            notification.body
        );
    }
}

/// Player that never makes a sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

impl SoundPlayer for SilentPlayer {
    fn play(&self, _sound: &SoundRef) -> Result<(), SoundError> {
        Ok(())
    }
}
