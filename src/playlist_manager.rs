//! Ordered play queue with coalesced reorder commits.
//!
//! The in-memory order always reflects the latest caller-visible state
//! immediately; commits of drag reorders to the engine are debounced and
//! coalesced elsewhere. Entries carry stable ids so the playing marker
//! survives reorders and is invalidated, never silently remapped, when
//! the playing entry is removed.

use log::debug;
use uuid::Uuid;

use crate::protocol::MediaRef;

/// One queue entry with a stable identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    /// Stable entry id.
    pub id: Uuid,
    /// The referenced media item.
    pub media: MediaRef,
}

impl PlaylistEntry {
    pub fn new(media: MediaRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            media,
        }
    }
}

/// In-flight coalesced reorder awaiting commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    /// Index the moved entry originally occupied.
    pub from: usize,
    /// Final resting index after the latest drag step.
    pub to: usize,
}

/// Mutable ordered queue owned by the session controller.
#[derive(Debug, Default)]
pub struct PlaylistState {
    entries: Vec<PlaylistEntry>,
    pending_move: Option<PendingMove>,
    playing_entry: Option<Uuid>,
}

impl PlaylistState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the whole queue. Any pending reorder is meaningless for
    /// the new order and is discarded.
    pub fn set_entries(&mut self, entries: Vec<PlaylistEntry>) {
        self.entries = entries;
        self.pending_move = None;
        self.playing_entry = None;
    }

    /// Index of the playing entry, if it is still in the queue.
    pub fn playing_index(&self) -> Option<usize> {
        let playing = self.playing_entry?;
        self.entries.iter().position(|entry| entry.id == playing)
    }

    /// Marks the first entry referencing `media` as playing, if any.
    pub fn mark_playing_media(&mut self, media: &MediaRef) {
        if let Some(entry) = self.entries.iter().find(|entry| entry.media == *media) {
            self.playing_entry = Some(entry.id);
        }
    }

    /// Moves the entry at `from` so it ends up at index `to`, applied to
    /// the in-memory order immediately. The pending commit keeps the
    /// original `from` and adopts the newest `to`, so a burst of drag
    /// steps coalesces into one net move.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.entries.len() || to >= self.entries.len() || from == to {
            debug!(
                "PlaylistState: rejecting move {} -> {} over {} entries",
                from,
                to,
                self.entries.len()
            );
            return false;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        match &mut self.pending_move {
            Some(pending) => pending.to = to,
            None => self.pending_move = Some(PendingMove { from, to }),
        }
        true
    }

    pub fn has_pending_move(&self) -> bool {
        self.pending_move.is_some()
    }

    pub fn take_pending_move(&mut self) -> Option<PendingMove> {
        self.pending_move.take()
    }

    pub fn discard_pending_move(&mut self) {
        if self.pending_move.take().is_some() {
            debug!("PlaylistState: discarding pending move");
        }
    }

    /// Removes the entry at `index`. Returns the entry and whether it was
    /// the playing one; the playing marker is cleared in that case.
    pub fn remove_item(&mut self, index: usize) -> Option<(PlaylistEntry, bool)> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        let was_playing = self.playing_entry == Some(entry.id);
        if was_playing {
            self.playing_entry = None;
        }
        Some((entry, was_playing))
    }

    /// Re-inserts an entry, clamping the index to the current length.
    /// Idempotent against an entry id already present, so an undo racing
    /// a commit never duplicates the row.
    pub fn insert_item(&mut self, index: usize, entry: PlaylistEntry) -> Option<usize> {
        if self.entries.iter().any(|existing| existing.id == entry.id) {
            debug!("PlaylistState: entry {} already present, skipping", entry.id);
            return None;
        }
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        Some(index)
    }
}
