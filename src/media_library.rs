//! Media library collaborator: per-media persisted state.
//!
//! The library owns resume points, track selections, and delay offsets as
//! opaque key/value entries per media location. Writes from the session
//! controller are fire-and-forget; eventual consistency is acceptable, so
//! the trait setters log failures instead of surfacing them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::error;
use rusqlite::{params, Connection, OptionalExtension};

use crate::protocol::{DelayKind, MediaRef, TrackKind};

/// A persisted playback position and when it was last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedPosition {
    pub position_ms: u64,
    pub updated_at: SystemTime,
}

/// Store of per-media playback metadata.
pub trait MediaLibrary: Send + Sync {
    fn saved_position(&self, media: &MediaRef) -> Option<SavedPosition>;
    fn set_saved_position(&self, media: &MediaRef, position_ms: u64);

    fn saved_track_selection(&self, media: &MediaRef, kind: TrackKind) -> Option<i32>;
    fn set_saved_track_selection(&self, media: &MediaRef, kind: TrackKind, track_id: i32);

    fn saved_delay(&self, media: &MediaRef, kind: DelayKind) -> Option<i64>;
    fn set_saved_delay(&self, media: &MediaRef, kind: DelayKind, delay_us: i64);
}

const KEY_POSITION: &str = "position_ms";

fn track_key(kind: TrackKind) -> &'static str {
    match kind {
        TrackKind::Audio => "track:audio",
        TrackKind::Subtitle => "track:subtitle",
        TrackKind::Video => "track:video",
    }
}

fn delay_key(kind: DelayKind) -> &'static str {
    match kind {
        DelayKind::Audio => "delay:audio",
        DelayKind::Subtitle => "delay:subtitle",
    }
}

fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// SQLite-backed media metadata store.
pub struct SqliteMediaLibrary {
    conn: Mutex<Connection>,
}

impl SqliteMediaLibrary {
    /// Opens the store in the user's data directory.
    pub fn open_default() -> Result<Self, rusqlite::Error> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playhead");
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            error!(
                "SqliteMediaLibrary: could not create data directory {}: {}",
                data_dir.display(),
                e
            );
        }
        Self::open(data_dir.join("media_meta.db"))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let library = Self {
            conn: Mutex::new(conn),
        };
        library.initialize_schema()?;
        Ok(library)
    }

    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let library = Self {
            conn: Mutex::new(conn),
        };
        library.initialize_schema()?;
        Ok(library)
    }

    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().expect("media library lock poisoned");
        conn.execute(
            "CREATE TABLE IF NOT EXISTS media_meta (
                location TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (location, key)
            )",
            [],
        )?;
        Ok(())
    }

    fn read_entry(&self, media: &MediaRef, key: &str) -> Option<(String, i64)> {
        let conn = self.conn.lock().expect("media library lock poisoned");
        let result = conn
            .query_row(
                "SELECT value, updated_at FROM media_meta WHERE location = ?1 AND key = ?2",
                params![media.location, key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional();
        match result {
            Ok(entry) => entry,
            Err(e) => {
                error!(
                    "SqliteMediaLibrary: failed to read {} for {}: {}",
                    key, media.location, e
                );
                None
            }
        }
    }

    fn write_entry(&self, media: &MediaRef, key: &str, value: &str) {
        let conn = self.conn.lock().expect("media library lock poisoned");
        let result = conn.execute(
            "INSERT INTO media_meta (location, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (location, key)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![media.location, key, value, unix_now_secs()],
        );
        if let Err(e) = result {
            error!(
                "SqliteMediaLibrary: failed to write {} for {}: {}",
                key, media.location, e
            );
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, media: &MediaRef, key: &str) -> Option<T> {
        let (value, _) = self.read_entry(media, key)?;
        serde_json::from_str(&value).ok()
    }

    fn write_json<T: serde::Serialize>(&self, media: &MediaRef, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(serialized) => self.write_entry(media, key, &serialized),
            Err(e) => error!(
                "SqliteMediaLibrary: failed to serialize {} for {}: {}",
                key, media.location, e
            ),
        }
    }
}

impl MediaLibrary for SqliteMediaLibrary {
    fn saved_position(&self, media: &MediaRef) -> Option<SavedPosition> {
        let (value, updated_at) = self.read_entry(media, KEY_POSITION)?;
        let position_ms = serde_json::from_str::<u64>(&value).ok()?;
        Some(SavedPosition {
            position_ms,
            updated_at: UNIX_EPOCH + Duration::from_secs(updated_at.max(0) as u64),
        })
    }

    fn set_saved_position(&self, media: &MediaRef, position_ms: u64) {
        self.write_json(media, KEY_POSITION, &position_ms);
    }

    fn saved_track_selection(&self, media: &MediaRef, kind: TrackKind) -> Option<i32> {
        self.read_json(media, track_key(kind))
    }

    fn set_saved_track_selection(&self, media: &MediaRef, kind: TrackKind, track_id: i32) {
        self.write_json(media, track_key(kind), &track_id);
    }

    fn saved_delay(&self, media: &MediaRef, kind: DelayKind) -> Option<i64> {
        self.read_json(media, delay_key(kind))
    }

    fn set_saved_delay(&self, media: &MediaRef, kind: DelayKind, delay_us: i64) {
        self.write_json(media, delay_key(kind), &delay_us);
    }
}
