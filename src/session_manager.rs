//! Session controller: the single authoritative holder of playback state.
//!
//! Translates caller commands into engine calls and engine events into
//! state transitions, keeping one consistent, race-free view of "where we
//! are" for rendering and persistence. Commands arrive on the caller's
//! thread, engine events on the engine's notification thread; one mutex
//! per session serializes both. Engine calls are fire-and-forget, so no
//! command ever blocks waiting on the engine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, SystemTime};

use log::{debug, error, info, trace, warn};
use tokio::sync::broadcast;

use crate::config::{sanitize_config, SessionConfig};
use crate::debounce::DebounceTimer;
use crate::delay::DelayController;
use crate::engine::EngineClient;
use crate::media_library::MediaLibrary;
use crate::playlist_manager::{PlaylistEntry, PlaylistState};
use crate::protocol::{
    AudioRouteClass, AudioRouteEvent, DelayKind, EngineEvent, MediaRef, Message, PlaybackSnapshot,
    PlaybackState, PlaylistMessage, SessionMessage, TrackKind,
};
use crate::resume::{ResumeDecision, ResumeGate, ResumeOutcome};
use crate::seek::SeekReconciler;

/// Synchronous result of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The engine load was issued (or the media was already current).
    Started,
    /// Loading is suspended until [`SessionManager::resolve_resume_decision`].
    DecisionPending,
    /// The controller is detached; the command was dropped.
    Rejected,
}

#[derive(Debug)]
struct PlaybackSession {
    state: PlaybackState,
    current_media: Option<MediaRef>,
    seekable: bool,
    pausable: bool,
    length_ms: u64,
}

impl PlaybackSession {
    fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            current_media: None,
            seekable: false,
            pausable: false,
            length_ms: 0,
        }
    }
}

#[derive(Debug)]
struct PendingLoad {
    media: MediaRef,
    position_ms: u64,
}

struct SessionCore {
    session: PlaybackSession,
    seek: SeekReconciler,
    delay: DelayController,
    resume: ResumeGate,
    playlist: PlaylistState,
    pending_load: Option<PendingLoad>,
    /// Resume point to seek to once the engine first reports Playing.
    pending_start_ms: Option<u64>,
    /// Selections requested before the engine parsed tracks of that kind.
    queued_track_selections: HashMap<TrackKind, i32>,
    /// Kinds whose saved selection was already restored for this load.
    restored_track_kinds: HashSet<TrackKind>,
    /// Bumped on every queue mutation; stale timer fires compare against it.
    move_generation: u64,
    detached: bool,
}

/// Top-level playback session controller.
///
/// One instance per attachment to a live engine. Constructed with its
/// collaborators injected; UI code holds the `Arc` and subscribes to the
/// notification bus instead of reading engine state.
pub struct SessionManager {
    engine: Arc<dyn EngineClient>,
    library: Arc<dyn MediaLibrary>,
    config: SessionConfig,
    bus_sender: broadcast::Sender<Message>,
    core: Mutex<SessionCore>,
    move_timer: DebounceTimer,
}

impl SessionManager {
    /// Attaches a controller to a live engine instance.
    pub fn attach(
        engine: Arc<dyn EngineClient>,
        library: Arc<dyn MediaLibrary>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let config = sanitize_config(config);
        let (bus_sender, _) = broadcast::channel(1024);
        Arc::new_cyclic(|weak: &Weak<SessionManager>| {
            let timer_handle = weak.clone();
            let move_timer = DebounceTimer::spawn("playhead-move-commit", move |generation| {
                if let Some(manager) = timer_handle.upgrade() {
                    manager.commit_pending_move(generation);
                }
            });
            let core = SessionCore {
                session: PlaybackSession::new(),
                seek: SeekReconciler::new(),
                delay: DelayController::new(),
                resume: ResumeGate::new(config.resume.policy),
                playlist: PlaylistState::new(),
                pending_load: None,
                pending_start_ms: None,
                queued_track_selections: HashMap::new(),
                restored_track_kinds: HashSet::new(),
                move_generation: 0,
                detached: false,
            };
            SessionManager {
                engine,
                library,
                config,
                bus_sender,
                core: Mutex::new(core),
                move_timer,
            }
        })
    }

    /// Subscribes to session and playlist notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.bus_sender.subscribe()
    }

    fn core(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().expect("session state lock poisoned")
    }

    fn publish(&self, message: Message) {
        let _ = self.bus_sender.send(message);
    }

    /// Requests a load of `media`. May suspend on a resume decision, in
    /// which case no engine call is issued until the caller resolves it.
    pub fn load_media(&self, media: MediaRef, from_start: bool) -> LoadOutcome {
        let mut core = self.core();
        if core.detached {
            warn!("SessionManager: load_media after detach, dropping");
            return LoadOutcome::Rejected;
        }
        core.pending_load = None;
        core.pending_start_ms = None;

        let continuing_current = core.session.current_media.as_ref() == Some(&media)
            && matches!(
                core.session.state,
                PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Buffering
            );
        let library_saved = self.library.saved_position(&media);
        match core
            .resume
            .evaluate(&media, from_start, continuing_current, library_saved)
        {
            ResumeOutcome::KeepCurrent => {
                debug!(
                    "SessionManager: {} already loaded, keeping engine position",
                    media.location
                );
                LoadOutcome::Started
            }
            ResumeOutcome::AskUser { position_ms } => {
                info!(
                    "SessionManager: resume decision required for {} at {}ms",
                    media.location, position_ms
                );
                core.session.state = PlaybackState::Loading;
                core.session.current_media = Some(media.clone());
                core.pending_load = Some(PendingLoad {
                    media: media.clone(),
                    position_ms,
                });
                self.publish(Message::Session(SessionMessage::StateChanged(
                    PlaybackState::Loading,
                )));
                self.publish(Message::Session(SessionMessage::ResumeDecisionRequested {
                    media,
                    position_ms,
                }));
                LoadOutcome::DecisionPending
            }
            ResumeOutcome::Start { position_ms } => {
                self.begin_engine_load(&mut core, media, position_ms);
                LoadOutcome::Started
            }
        }
    }

    /// Resolves a pending resume decision and issues the suspended load.
    pub fn resolve_resume_decision(&self, decision: ResumeDecision) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        let Some(pending) = core.pending_load.take() else {
            debug!("SessionManager: no resume decision pending");
            return;
        };
        let position_ms = match decision {
            ResumeDecision::Resume => pending.position_ms,
            ResumeDecision::FromStart => 0,
        };
        self.begin_engine_load(&mut core, pending.media, position_ms);
    }

    fn begin_engine_load(&self, core: &mut SessionCore, media: MediaRef, start_ms: u64) {
        info!(
            "SessionManager: loading {} start={}ms",
            media.location, start_ms
        );
        core.session.state = PlaybackState::Loading;
        core.session.current_media = Some(media.clone());
        core.session.length_ms = 0;
        core.seek
            .reset(if start_ms > 0 { Some(start_ms) } else { None });
        core.delay.reset();
        core.queued_track_selections.clear();
        core.restored_track_kinds.clear();
        core.pending_start_ms = if start_ms > 0 { Some(start_ms) } else { None };
        core.playlist.mark_playing_media(&media);

        for kind in [DelayKind::Audio, DelayKind::Subtitle] {
            if let Some(delay_us) = self.library.saved_delay(&media, kind) {
                if delay_us != 0 {
                    core.delay.set_delay(kind, delay_us);
                    self.engine.set_delay(kind, delay_us);
                    self.publish(Message::Session(SessionMessage::DelayChanged {
                        kind,
                        delay_us,
                    }));
                }
            }
        }

        self.engine.load(&media);
        self.engine.play();
        self.publish(Message::Session(SessionMessage::StateChanged(
            PlaybackState::Loading,
        )));
    }

    pub fn play(&self) {
        let core = self.core();
        if core.detached {
            debug!("SessionManager: play after detach, dropping");
            return;
        }
        self.engine.play();
    }

    pub fn pause(&self) {
        let core = self.core();
        if core.detached {
            return;
        }
        if !core.session.pausable {
            debug!("SessionManager: pause rejected, media not pausable");
            return;
        }
        self.engine.pause();
    }

    /// Ends the session. The resume position is written back first; any
    /// pending queue reorder is discarded, never flushed.
    pub fn stop(&self) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        self.end_session(&mut core, false);
    }

    /// Detaches from the engine instance for good. Like [`stop`], but the
    /// engine is assumed gone, so no further call is issued to it.
    ///
    /// [`stop`]: SessionManager::stop
    pub fn detach(&self) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        self.end_session(&mut core, true);
    }

    fn end_session(&self, core: &mut SessionCore, detach: bool) {
        self.save_position(core);
        self.move_timer.cancel();
        core.move_generation += 1;
        core.playlist.discard_pending_move();
        core.pending_load = None;
        core.pending_start_ms = None;
        core.queued_track_selections.clear();
        if let Some((kind, delay_us)) = core.delay.end_adjusting() {
            if let Some(media) = core.session.current_media.clone() {
                self.library.set_saved_delay(&media, kind, delay_us);
            }
        }
        if detach {
            core.detached = true;
        } else {
            self.engine.stop();
        }
        core.session.state = PlaybackState::Ended;
        core.seek.reset(None);
        self.publish(Message::Session(SessionMessage::StateChanged(
            PlaybackState::Ended,
        )));
        if detach {
            self.publish(Message::Session(SessionMessage::SessionEnded));
        }
    }

    fn save_position(&self, core: &mut SessionCore) {
        let Some(media) = core.session.current_media.clone() else {
            return;
        };
        if !matches!(
            core.session.state,
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Buffering
        ) {
            return;
        }
        let position_ms = core.seek.reconcile(self.engine.position_ms());
        self.library.set_saved_position(&media, position_ms);
        debug!(
            "SessionManager: saved position {}ms for {}",
            position_ms, media.location
        );
    }

    /// Clears a terminal `Error` (or any other) state back to `Idle`.
    pub fn reset(&self) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        info!("SessionManager: reset to idle");
        self.move_timer.cancel();
        core.move_generation += 1;
        core.playlist.discard_pending_move();
        core.pending_load = None;
        core.pending_start_ms = None;
        core.queued_track_selections.clear();
        core.restored_track_kinds.clear();
        core.session = PlaybackSession::new();
        core.seek.reset(None);
        core.delay.reset();
        self.publish(Message::Session(SessionMessage::StateChanged(
            PlaybackState::Idle,
        )));
    }

    /// Seeks to `position_ms`. Succeeds synchronously from the caller's
    /// perspective; the reconciler hides engine latency. Returns false
    /// without touching the engine when the media is not seekable.
    pub fn seek(&self, position_ms: u64) -> bool {
        let mut core = self.core();
        if core.detached {
            return false;
        }
        if !core.session.seekable {
            debug!(
                "SessionManager: seek to {}ms rejected, media not seekable",
                position_ms
            );
            return false;
        }
        if core.seek.is_reconciling() {
            debug!("SessionManager: re-seek before settlement, latest seek wins");
        }
        let observed_ms = self.engine.position_ms();
        core.seek.begin_seek(position_ms, observed_ms);
        self.engine.seek_to(position_ms);
        let length_ms = core.session.length_ms;
        self.publish(Message::Session(SessionMessage::PositionChanged {
            reported_ms: position_ms,
            length_ms,
        }));
        true
    }

    /// Selects a track, queueing the request when the engine has not
    /// parsed tracks of that kind yet. The selection is persisted against
    /// the current media so a later load restores it.
    pub fn apply_track_selection(&self, kind: TrackKind, track_id: i32) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        if self.engine.tracks(kind).is_empty() {
            debug!(
                "SessionManager: {:?} tracks not available yet, queueing selection {}",
                kind, track_id
            );
            core.queued_track_selections.insert(kind, track_id);
            return;
        }
        self.select_track(&mut core, kind, track_id);
    }

    fn select_track(&self, core: &mut SessionCore, kind: TrackKind, track_id: i32) {
        self.engine.set_track(kind, track_id);
        if let Some(media) = core.session.current_media.clone() {
            self.library.set_saved_track_selection(&media, kind, track_id);
        }
        core.restored_track_kinds.insert(kind);
        self.publish(Message::Session(SessionMessage::TrackSelectionApplied {
            kind,
            track_id,
        }));
    }

    /// Enters delay-adjustment mode, implicitly ending (and persisting)
    /// an adjustment of the other kind.
    pub fn start_adjusting(&self, kind: DelayKind) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        if let Some((ended_kind, delay_us)) = core.delay.start_adjusting(kind) {
            if let Some(media) = core.session.current_media.clone() {
                self.library.set_saved_delay(&media, ended_kind, delay_us);
            }
        }
    }

    /// Adds `delta_us` to the active offset, pushes it to the engine and
    /// returns the new absolute value for display. No-op outside
    /// adjustment mode.
    pub fn adjust_by(&self, delta_us: i64) -> Option<i64> {
        let mut core = self.core();
        if core.detached {
            return None;
        }
        let (kind, delay_us) = core.delay.adjust_by(delta_us)?;
        self.engine.set_delay(kind, delay_us);
        if let Some(media) = core.session.current_media.clone() {
            self.library.set_saved_delay(&media, kind, delay_us);
        }
        self.publish(Message::Session(SessionMessage::DelayChanged {
            kind,
            delay_us,
        }));
        Some(delay_us)
    }

    /// Leaves delay-adjustment mode and persists the final value.
    pub fn end_adjusting(&self) {
        let mut core = self.core();
        if let Some((kind, delay_us)) = core.delay.end_adjusting() {
            if let Some(media) = core.session.current_media.clone() {
                self.library.set_saved_delay(&media, kind, delay_us);
            }
        }
    }

    /// Configured per-step delay increment for UI button wiring.
    pub fn delay_step_us(&self) -> i64 {
        self.config.delay.step_us
    }

    /// Feeds an external audio route change. A route class with a
    /// configured default offset toggles that offset automatically.
    pub fn on_audio_route_event(&self, event: AudioRouteEvent) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        let default_us = self.config.delay.bluetooth_offset_us;
        match event {
            AudioRouteEvent::Connected {
                class: AudioRouteClass::BluetoothOutput,
            } => {
                if let Some(delay_us) = core.delay.on_route_connected(default_us) {
                    info!(
                        "SessionManager: applying default audio delay {}us for bluetooth route",
                        delay_us
                    );
                    self.engine.set_delay(DelayKind::Audio, delay_us);
                    self.publish(Message::Session(SessionMessage::DelayChanged {
                        kind: DelayKind::Audio,
                        delay_us,
                    }));
                }
            }
            AudioRouteEvent::Disconnected {
                class: AudioRouteClass::BluetoothOutput,
            } => {
                if let Some(delay_us) = core.delay.on_route_disconnected(default_us) {
                    info!("SessionManager: reverting default audio delay after route disconnect");
                    self.engine.set_delay(DelayKind::Audio, delay_us);
                    self.publish(Message::Session(SessionMessage::DelayChanged {
                        kind: DelayKind::Audio,
                        delay_us,
                    }));
                }
            }
            _ => trace!("SessionManager: ignoring audio route event {:?}", event),
        }
    }

    /// Records a playback position handed over from outside this session,
    /// consulted (once) by the next load's resume decision.
    pub fn set_transient_resume(&self, media: MediaRef, position_ms: u64) {
        let mut core = self.core();
        core.resume
            .set_transient(media, position_ms, SystemTime::now());
    }

    /// Replaces the play queue.
    pub fn set_queue(&self, media: Vec<MediaRef>) {
        let mut core = self.core();
        if core.detached {
            return;
        }
        self.move_timer.cancel();
        core.move_generation += 1;
        core.playlist
            .set_entries(media.into_iter().map(PlaylistEntry::new).collect());
        self.publish(Message::Playlist(PlaylistMessage::OrderChanged));
    }

    /// Current queue entries in order.
    pub fn queue_entries(&self) -> Vec<PlaylistEntry> {
        self.core().playlist.entries().to_vec()
    }

    /// Moves a queue entry so it ends up at index `to`. The in-memory
    /// order changes immediately; the engine commit is debounced so a
    /// burst of drag steps coalesces into one net move.
    pub fn move_item(&self, from: usize, to: usize) {
        let mut core = self.core();
        if core.detached {
            debug!("SessionManager: move_item after detach, dropping");
            return;
        }
        if !core.playlist.move_item(from, to) {
            return;
        }
        core.move_generation += 1;
        let generation = core.move_generation;
        self.move_timer.arm(
            Duration::from_millis(self.config.playlist.move_debounce_ms),
            generation,
        );
        self.publish(Message::Playlist(PlaylistMessage::OrderChanged));
    }

    /// Removes a queue entry immediately, in memory and at the engine.
    /// Returns the removed entry so the caller can offer an undo.
    pub fn remove_item(&self, index: usize) -> Option<PlaylistEntry> {
        let mut core = self.core();
        if core.detached {
            return None;
        }
        if core.playlist.has_pending_move() {
            // The pending reorder's indices are stale once the list shrinks.
            core.playlist.discard_pending_move();
            core.move_generation += 1;
            self.move_timer.cancel();
        }
        let (entry, was_playing) = core.playlist.remove_item(index)?;
        if let Err(e) = self.engine.queue_remove(index) {
            warn!(
                "SessionManager: engine rejected queue removal at {}: {}",
                index, e
            );
        }
        if was_playing {
            self.publish(Message::Playlist(PlaylistMessage::PlayingEntryInvalidated));
        }
        if core.playlist.is_empty() {
            debug!("SessionManager: queue is now empty");
        }
        self.publish(Message::Playlist(PlaylistMessage::EntryRemoved { index }));
        Some(entry)
    }

    /// Re-inserts an entry, the undo path for [`remove_item`]. Idempotent
    /// against an entry id that is already present.
    ///
    /// [`remove_item`]: SessionManager::remove_item
    pub fn insert_item(&self, index: usize, entry: PlaylistEntry) -> bool {
        let mut core = self.core();
        if core.detached {
            return false;
        }
        if core.playlist.has_pending_move() {
            core.playlist.discard_pending_move();
            core.move_generation += 1;
            self.move_timer.cancel();
        }
        let media = entry.media.clone();
        let Some(inserted_at) = core.playlist.insert_item(index, entry) else {
            return false;
        };
        if let Err(e) = self.engine.queue_insert(inserted_at, &media) {
            warn!(
                "SessionManager: engine rejected queue insert at {}: {}",
                inserted_at, e
            );
        }
        self.publish(Message::Playlist(PlaylistMessage::EntryInserted {
            index: inserted_at,
        }));
        true
    }

    fn commit_pending_move(&self, generation: u64) {
        let mut core = self.core();
        if core.detached {
            debug!("SessionManager: dropping queue commit after detach");
            return;
        }
        if generation != core.move_generation {
            debug!(
                "SessionManager: dropping stale queue commit, generation {} != {}",
                generation, core.move_generation
            );
            return;
        }
        let Some(pending) = core.playlist.take_pending_move() else {
            return;
        };
        // Removing `from` shifts everything behind it down one, so a
        // downward move inserts before the slot after the target.
        let insert_before = if pending.to > pending.from {
            pending.to + 1
        } else {
            pending.to
        };
        match self.engine.queue_move(pending.from, insert_before) {
            Ok(()) => debug!(
                "SessionManager: committed queue move {} -> {}",
                pending.from, pending.to
            ),
            Err(e) => {
                // No rollback: the order stays as the user left it and the
                // next successful mutation re-synchronizes.
                warn!("SessionManager: queue move commit failed: {}", e);
                self.publish(Message::Playlist(PlaylistMessage::MoveCommitFailed {
                    reason: e.to_string(),
                }));
            }
        }
    }

    /// Single ingress point for asynchronous engine notifications. Safe
    /// to call from the engine's notification thread; never blocks.
    pub fn on_engine_event(&self, event: EngineEvent) {
        let mut core = self.core();
        if core.detached {
            trace!("SessionManager: engine event after detach: {:?}", event);
            return;
        }
        match event {
            EngineEvent::Opening => trace!("SessionManager: engine opening"),
            EngineEvent::Playing => self.handle_playing(&mut core),
            EngineEvent::Paused => {
                if core.session.state != PlaybackState::Paused {
                    core.session.state = PlaybackState::Paused;
                    self.publish(Message::Session(SessionMessage::StateChanged(
                        PlaybackState::Paused,
                    )));
                }
            }
            EngineEvent::Stopped => {
                if !matches!(
                    core.session.state,
                    PlaybackState::Idle | PlaybackState::Error | PlaybackState::Ended
                ) {
                    core.session.state = PlaybackState::Ended;
                    self.publish(Message::Session(SessionMessage::StateChanged(
                        PlaybackState::Ended,
                    )));
                }
            }
            EngineEvent::EndReached => {
                if let Some(media) = core.session.current_media.clone() {
                    // Completed playback spends the resume point.
                    self.library.set_saved_position(&media, 0);
                }
                core.session.state = PlaybackState::Ended;
                self.publish(Message::Session(SessionMessage::StateChanged(
                    PlaybackState::Ended,
                )));
            }
            EngineEvent::EncounteredError(reason) => {
                error!("SessionManager: engine fault: {}", reason);
                core.session.state = PlaybackState::Error;
                core.pending_load = None;
                core.pending_start_ms = None;
                core.playlist.discard_pending_move();
                core.move_generation += 1;
                self.move_timer.cancel();
                self.publish(Message::Session(SessionMessage::StateChanged(
                    PlaybackState::Error,
                )));
                self.publish(Message::Session(SessionMessage::EngineFault { reason }));
            }
            EngineEvent::TimeChanged(raw_ms) => {
                let reported_ms = core.seek.reconcile(raw_ms);
                let length_ms = core.session.length_ms;
                self.publish(Message::Session(SessionMessage::PositionChanged {
                    reported_ms,
                    length_ms,
                }));
            }
            EngineEvent::LengthChanged(length_ms) => core.session.length_ms = length_ms,
            EngineEvent::SeekableChanged(seekable) => {
                core.session.seekable = seekable;
                self.publish(Message::Session(SessionMessage::CapabilitiesChanged {
                    seekable,
                    pausable: core.session.pausable,
                }));
            }
            EngineEvent::PausableChanged(pausable) => {
                core.session.pausable = pausable;
                self.publish(Message::Session(SessionMessage::CapabilitiesChanged {
                    seekable: core.session.seekable,
                    pausable,
                }));
            }
            EngineEvent::Buffering(pct) => self.handle_buffering(&mut core, pct),
            EngineEvent::TracksAdded(kind) => self.handle_tracks_added(&mut core, kind),
            EngineEvent::TracksRemoved(kind) => {
                trace!("SessionManager: tracks of {:?} removed", kind)
            }
        }
    }

    fn handle_playing(&self, core: &mut SessionCore) {
        core.session.seekable = self.engine.is_seekable();
        core.session.pausable = self.engine.is_pausable();
        let length_ms = self.engine.length_ms();
        if length_ms > 0 {
            core.session.length_ms = length_ms;
        }
        if let Some(start_ms) = core.pending_start_ms.take() {
            debug!("SessionManager: seeking to resume point {}ms", start_ms);
            let observed_ms = self.engine.position_ms();
            core.seek.begin_seek(start_ms, observed_ms);
            self.engine.seek_to(start_ms);
        }
        if core.session.state != PlaybackState::Playing {
            core.session.state = PlaybackState::Playing;
            self.publish(Message::Session(SessionMessage::StateChanged(
                PlaybackState::Playing,
            )));
        }
    }

    fn handle_buffering(&self, core: &mut SessionCore, pct: f32) {
        if pct >= 100.0 {
            if core.session.state == PlaybackState::Buffering {
                core.session.state = PlaybackState::Playing;
                self.publish(Message::Session(SessionMessage::StateChanged(
                    PlaybackState::Playing,
                )));
            }
        } else if core.session.state == PlaybackState::Playing {
            core.session.state = PlaybackState::Buffering;
            self.publish(Message::Session(SessionMessage::StateChanged(
                PlaybackState::Buffering,
            )));
        }
    }

    fn handle_tracks_added(&self, core: &mut SessionCore, kind: TrackKind) {
        if let Some(track_id) = core.queued_track_selections.remove(&kind) {
            debug!(
                "SessionManager: applying queued {:?} selection {}",
                kind, track_id
            );
            self.select_track(core, kind, track_id);
            return;
        }
        if core.restored_track_kinds.contains(&kind) {
            return;
        }
        core.restored_track_kinds.insert(kind);
        let Some(media) = core.session.current_media.clone() else {
            return;
        };
        if let Some(track_id) = self.library.saved_track_selection(&media, kind) {
            debug!(
                "SessionManager: restoring saved {:?} selection {}",
                kind, track_id
            );
            self.engine.set_track(kind, track_id);
            self.publish(Message::Session(SessionMessage::TrackSelectionApplied {
                kind,
                track_id,
            }));
        }
    }

    /// Reconciled view for rendering. The position shown while a seek is
    /// settling is the seek target, never the engine's raw report.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let mut core = self.core();
        let raw_ms = if core.detached {
            0
        } else {
            self.engine.position_ms()
        };
        let position_ms = core.seek.reconcile(raw_ms);
        PlaybackSnapshot {
            state: core.session.state,
            media: core.session.current_media.clone(),
            position_ms,
            length_ms: core.session.length_ms,
            seekable: core.session.seekable,
            pausable: core.session.pausable,
            audio_delay_us: core.delay.audio_delay_us(),
            subtitle_delay_us: core.delay.subtitle_delay_us(),
            delay_mode: core.delay.mode(),
            playing_index: core.playlist.playing_index(),
            queue_len: core.playlist.len(),
        }
    }
}
