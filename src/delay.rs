//! Audio/subtitle delay adjustment state.
//!
//! At most one delay kind is under adjustment at a time. Entering one mode
//! while the other is active first ends the other, handing its final value
//! back to the caller for persistence. A configured default audio offset
//! can be applied automatically when an external route of the matching
//! class connects, and reverted when it disconnects.

use crate::protocol::{DelayKind, DelayMode};

/// Mutually exclusive adjustment mode plus the two signed offsets.
#[derive(Debug, Default)]
pub struct DelayController {
    mode: DelayMode,
    audio_delay_us: i64,
    subtitle_delay_us: i64,
}

impl DelayController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DelayMode {
        self.mode
    }

    pub fn audio_delay_us(&self) -> i64 {
        self.audio_delay_us
    }

    pub fn subtitle_delay_us(&self) -> i64 {
        self.subtitle_delay_us
    }

    /// Restores a persisted offset, e.g. when re-loading a media item.
    pub fn set_delay(&mut self, kind: DelayKind, delay_us: i64) {
        match kind {
            DelayKind::Audio => self.audio_delay_us = delay_us,
            DelayKind::Subtitle => self.subtitle_delay_us = delay_us,
        }
    }

    /// Leaves adjustment mode and zeroes both offsets for a fresh load.
    pub fn reset(&mut self) {
        self.mode = DelayMode::Off;
        self.audio_delay_us = 0;
        self.subtitle_delay_us = 0;
    }

    /// Enters adjustment mode for `kind`. If the other kind was active its
    /// final value is returned so the caller can persist it.
    pub fn start_adjusting(&mut self, kind: DelayKind) -> Option<(DelayKind, i64)> {
        let persisted = match (self.mode, kind) {
            (DelayMode::Audio, DelayKind::Subtitle) => {
                Some((DelayKind::Audio, self.audio_delay_us))
            }
            (DelayMode::Subtitle, DelayKind::Audio) => {
                Some((DelayKind::Subtitle, self.subtitle_delay_us))
            }
            _ => None,
        };
        self.mode = match kind {
            DelayKind::Audio => DelayMode::Audio,
            DelayKind::Subtitle => DelayMode::Subtitle,
        };
        persisted
    }

    /// Adds `delta_us` to the active offset and returns the kind and new
    /// absolute value for display. Returns `None` while no adjustment is
    /// active; that call is a no-op.
    pub fn adjust_by(&mut self, delta_us: i64) -> Option<(DelayKind, i64)> {
        match self.mode {
            DelayMode::Off => None,
            DelayMode::Audio => {
                self.audio_delay_us += delta_us;
                Some((DelayKind::Audio, self.audio_delay_us))
            }
            DelayMode::Subtitle => {
                self.subtitle_delay_us += delta_us;
                Some((DelayKind::Subtitle, self.subtitle_delay_us))
            }
        }
    }

    /// Leaves adjustment mode, returning the final value to persist.
    pub fn end_adjusting(&mut self) -> Option<(DelayKind, i64)> {
        let persisted = match self.mode {
            DelayMode::Off => None,
            DelayMode::Audio => Some((DelayKind::Audio, self.audio_delay_us)),
            DelayMode::Subtitle => Some((DelayKind::Subtitle, self.subtitle_delay_us)),
        };
        self.mode = DelayMode::Off;
        persisted
    }

    /// A route requiring `default_us` connected. Applies the default only
    /// when no audio offset is set for the session yet, and never while
    /// the user is adjusting the audio delay. Returns the new offset to
    /// push to the engine.
    pub fn on_route_connected(&mut self, default_us: i64) -> Option<i64> {
        if default_us == 0 || self.mode == DelayMode::Audio || self.audio_delay_us != 0 {
            return None;
        }
        self.audio_delay_us = default_us;
        Some(default_us)
    }

    /// The route disconnected. Reverts to zero only while the applied
    /// offset still equals the default, so a user-chosen value survives.
    pub fn on_route_disconnected(&mut self, default_us: i64) -> Option<i64> {
        if default_us == 0 || self.audio_delay_us != default_us {
            return None;
        }
        self.audio_delay_us = 0;
        Some(0)
    }
}
