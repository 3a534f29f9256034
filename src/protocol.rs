//! Notification protocol shared by the session controller and its subscribers.
//!
//! This module defines all payloads published on the session bus plus the
//! event set consumed from the media engine. Subscribers render from these
//! messages and from [`PlaybackSnapshot`], never from raw engine state.

/// Playback lifecycle of one engine attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum PlaybackState {
    Idle,      // No media loaded
    Loading,   // Load issued, engine not playing yet
    Playing,
    Paused,
    Buffering, // Engine reported an incomplete buffer while playing
    Error,     // Terminal until an explicit reset
    Ended,     // Explicit stop, end of media, or detach
}

/// Track category exposed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum TrackKind {
    Audio,
    Subtitle,
    Video,
}

/// Stream kind accepting a signed render offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum DelayKind {
    Audio,
    Subtitle,
}

/// Active delay-adjustment mode. At most one kind is adjusted at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub enum DelayMode {
    #[default]
    Off,
    Audio,
    Subtitle,
}

/// Reference to a media item, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub struct MediaRef {
    /// Location string understood by the engine and the media library.
    pub location: String,
}

impl MediaRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// One selectable track as enumerated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct TrackInfo {
    /// Engine-scoped track id.
    pub id: i32,
    /// User-visible track name.
    pub name: String,
}

/// Asynchronous notification from the media engine.
///
/// Events for one session arrive in the order the engine generated them,
/// on the engine's own notification context.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Opening,
    Playing,
    Paused,
    Stopped,
    EndReached,
    EncounteredError(String),
    /// Raw playback position report in milliseconds. May cover the
    /// pre-seek trajectory for a short window after a seek.
    TimeChanged(u64),
    LengthChanged(u64),
    SeekableChanged(bool),
    PausableChanged(bool),
    /// Buffer fill in percent, 0.0 to 100.0.
    Buffering(f32),
    /// Tracks of this kind became available (media parsed far enough).
    TracksAdded(TrackKind),
    TracksRemoved(TrackKind),
}

/// External audio route classes relevant to automatic delay offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRouteClass {
    BluetoothOutput,
    WiredOutput,
    BuiltinOutput,
}

/// Connectivity change on an external audio route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRouteEvent {
    Connected { class: AudioRouteClass },
    Disconnected { class: AudioRouteClass },
}

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Session(SessionMessage),
    Playlist(PlaylistMessage),
}

/// Session-domain notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMessage {
    StateChanged(PlaybackState),
    /// Reconciled position report. Never the engine's raw position while a
    /// seek is still settling.
    PositionChanged {
        reported_ms: u64,
        length_ms: u64,
    },
    /// A load is suspended until the caller resolves the resume decision.
    ResumeDecisionRequested {
        media: MediaRef,
        position_ms: u64,
    },
    CapabilitiesChanged {
        seekable: bool,
        pausable: bool,
    },
    DelayChanged {
        kind: DelayKind,
        delay_us: i64,
    },
    TrackSelectionApplied {
        kind: TrackKind,
        track_id: i32,
    },
    /// Engine detach or fatal playback error. Surfaced, never auto-retried.
    EngineFault {
        reason: String,
    },
    SessionEnded,
}

/// Playlist-domain notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistMessage {
    OrderChanged,
    EntryRemoved { index: usize },
    EntryInserted { index: usize },
    /// The currently-playing entry was removed; no playing index is valid
    /// until the next load.
    PlayingEntryInvalidated,
    /// Commit of a coalesced reorder failed. The in-memory order is kept.
    MoveCommitFailed { reason: String },
}

/// Consistent, reconciled view of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub media: Option<MediaRef>,
    /// Reconciled position in milliseconds.
    pub position_ms: u64,
    /// Duration in milliseconds, 0 when unknown.
    pub length_ms: u64,
    pub seekable: bool,
    pub pausable: bool,
    pub audio_delay_us: i64,
    pub subtitle_delay_us: i64,
    pub delay_mode: DelayMode,
    /// Index of the playing entry in the queue, if it is still present.
    pub playing_index: Option<usize>,
    pub queue_len: usize,
}
