//! Playback session controller for a media-player application.
//!
//! One [`SessionManager`] instance owns the relationship between a "now
//! playing" view and an asynchronous media engine: it reconciles caller
//! commands (seek, load, delay adjustment, queue edits, resume decisions)
//! against the engine's own stream of state notifications and republishes
//! a single consistent view for rendering and persistence.
//!
//! The engine and the media library are collaborators injected behind the
//! [`EngineClient`] and [`MediaLibrary`] traits; this crate never reaches
//! them through ambient global state. Subscribers receive
//! [`protocol::Message`] notifications on a broadcast bus and can pull a
//! reconciled [`protocol::PlaybackSnapshot`] at any time.

mod config;
mod debounce;
mod delay;
mod engine;
mod media_library;
mod playlist_manager;
pub mod protocol;
mod resume;
mod seek;
mod session_manager;
#[cfg(test)]
mod test_support;

pub use config::{
    default_config_path, load_config, sanitize_config, save_config, DelayConfig, PlaylistConfig,
    ResumeConfig, SessionConfig,
};
pub use engine::{EngineClient, EngineError};
pub use media_library::{MediaLibrary, SavedPosition, SqliteMediaLibrary};
pub use playlist_manager::PlaylistEntry;
pub use protocol::{
    AudioRouteClass, AudioRouteEvent, DelayKind, DelayMode, EngineEvent, MediaRef, Message,
    PlaybackSnapshot, PlaybackState, PlaylistMessage, SessionMessage, TrackInfo, TrackKind,
};
pub use resume::{ResumeDecision, ResumePolicy};
pub use session_manager::{LoadOutcome, SessionManager};
