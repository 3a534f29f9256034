//! Seam to the opaque media engine.
//!
//! The engine owns decode, demux, and render. This crate only issues
//! commands through [`EngineClient`] and observes outcomes later through
//! the [`crate::protocol::EngineEvent`] stream.

use crate::protocol::{DelayKind, MediaRef, TrackInfo, TrackKind};

/// Failure reported by an engine queue mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine instance backing this session is gone.
    SessionGone,
    /// The engine refused the operation.
    Rejected(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::SessionGone => write!(f, "engine session is gone"),
            EngineError::Rejected(reason) => write!(f, "engine rejected operation: {}", reason),
        }
    }
}

impl std::error::Error for EngineError {}

/// Command surface of a live engine instance.
///
/// Contract: every method is fire-and-forget and must return without
/// blocking on playback progress. Implementations must never call back
/// into the session controller synchronously; state changes are delivered
/// as events from the engine's own notification context.
pub trait EngineClient: Send + Sync {
    /// Starts loading the given media. Playback state arrives via events.
    fn load(&self, media: &MediaRef);
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn seek_to(&self, position_ms: u64);

    /// Raw position report. May lag or lead a just-issued seek.
    fn position_ms(&self) -> u64;
    /// Duration of the loaded media, 0 when unknown.
    fn length_ms(&self) -> u64;
    fn is_seekable(&self) -> bool;
    fn is_pausable(&self) -> bool;

    /// Tracks of one kind, empty until the media is parsed far enough.
    fn tracks(&self, kind: TrackKind) -> Vec<TrackInfo>;
    fn set_track(&self, kind: TrackKind, track_id: i32);

    fn set_delay(&self, kind: DelayKind, delay_us: i64);
    fn delay(&self, kind: DelayKind) -> i64;

    /// Applies a queue reorder as a single remove-then-insert splice.
    /// `insert_before` is an index into the queue as it was before the
    /// removal; implementations account for the shift when
    /// `insert_before > from`.
    fn queue_move(&self, from: usize, insert_before: usize) -> Result<(), EngineError>;
    fn queue_remove(&self, index: usize) -> Result<(), EngineError>;
    fn queue_insert(&self, index: usize, media: &MediaRef) -> Result<(), EngineError>;
}
