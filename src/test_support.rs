//! Shared fakes and bus helpers for controller tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, Once};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;

use crate::engine::{EngineClient, EngineError};
use crate::media_library::{MediaLibrary, SavedPosition};
use crate::protocol::{DelayKind, MediaRef, Message, TrackInfo, TrackKind};

static INIT_LOGGING: Once = Once::new();

pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let mut clog = colog::default_builder();
        clog.filter(None, log::LevelFilter::Debug);
        clog.init();
    });
}

/// One recorded call against the fake engine, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(MediaRef),
    Play,
    Pause,
    Stop,
    SeekTo(u64),
    SetTrack(TrackKind, i32),
    SetDelay(DelayKind, i64),
    QueueMove { from: usize, insert_before: usize },
    QueueRemove(usize),
    QueueInsert(usize, MediaRef),
}

/// Scriptable engine double recording every call.
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<EngineCall>>,
    position_ms: AtomicU64,
    length_ms: AtomicU64,
    seekable: AtomicBool,
    pausable: AtomicBool,
    tracks: Mutex<HashMap<TrackKind, Vec<TrackInfo>>>,
    reject_queue_ops: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Self {
        let engine = Self::default();
        engine.seekable.store(true, Ordering::SeqCst);
        engine.pausable.store(true, Ordering::SeqCst);
        engine
    }

    pub fn set_position(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::SeqCst);
    }

    pub fn set_length(&self, length_ms: u64) {
        self.length_ms.store(length_ms, Ordering::SeqCst);
    }

    pub fn set_seekable(&self, seekable: bool) {
        self.seekable.store(seekable, Ordering::SeqCst);
    }

    pub fn set_pausable(&self, pausable: bool) {
        self.pausable.store(pausable, Ordering::SeqCst);
    }

    pub fn set_tracks(&self, kind: TrackKind, tracks: Vec<TrackInfo>) {
        self.tracks
            .lock()
            .expect("fake engine tracks lock poisoned")
            .insert(kind, tracks);
    }

    pub fn set_reject_queue_ops(&self, reject: bool) {
        self.reject_queue_ops.store(reject, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .expect("fake engine calls lock poisoned")
            .clone()
    }

    pub fn count_calls<F: Fn(&EngineCall) -> bool>(&self, predicate: F) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: EngineCall) {
        self.calls
            .lock()
            .expect("fake engine calls lock poisoned")
            .push(call);
    }
}

impl EngineClient for FakeEngine {
    fn load(&self, media: &MediaRef) {
        self.record(EngineCall::Load(media.clone()));
    }

    fn play(&self) {
        self.record(EngineCall::Play);
    }

    fn pause(&self) {
        self.record(EngineCall::Pause);
    }

    fn stop(&self) {
        self.record(EngineCall::Stop);
    }

    fn seek_to(&self, position_ms: u64) {
        self.record(EngineCall::SeekTo(position_ms));
    }

    fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    fn length_ms(&self) -> u64 {
        self.length_ms.load(Ordering::SeqCst)
    }

    fn is_seekable(&self) -> bool {
        self.seekable.load(Ordering::SeqCst)
    }

    fn is_pausable(&self) -> bool {
        self.pausable.load(Ordering::SeqCst)
    }

    fn tracks(&self, kind: TrackKind) -> Vec<TrackInfo> {
        self.tracks
            .lock()
            .expect("fake engine tracks lock poisoned")
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn set_track(&self, kind: TrackKind, track_id: i32) {
        self.record(EngineCall::SetTrack(kind, track_id));
    }

    fn set_delay(&self, kind: DelayKind, delay_us: i64) {
        self.record(EngineCall::SetDelay(kind, delay_us));
    }

    fn delay(&self, kind: DelayKind) -> i64 {
        self.calls()
            .iter()
            .rev()
            .find_map(|call| match call {
                EngineCall::SetDelay(set_kind, delay_us) if *set_kind == kind => Some(*delay_us),
                _ => None,
            })
            .unwrap_or(0)
    }

    fn queue_move(&self, from: usize, insert_before: usize) -> Result<(), EngineError> {
        if self.reject_queue_ops.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("scripted rejection".to_string()));
        }
        self.record(EngineCall::QueueMove {
            from,
            insert_before,
        });
        Ok(())
    }

    fn queue_remove(&self, index: usize) -> Result<(), EngineError> {
        if self.reject_queue_ops.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("scripted rejection".to_string()));
        }
        self.record(EngineCall::QueueRemove(index));
        Ok(())
    }

    fn queue_insert(&self, index: usize, media: &MediaRef) -> Result<(), EngineError> {
        if self.reject_queue_ops.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected("scripted rejection".to_string()));
        }
        self.record(EngineCall::QueueInsert(index, media.clone()));
        Ok(())
    }
}

/// In-memory media library double.
#[derive(Default)]
pub struct FakeLibrary {
    positions: Mutex<HashMap<String, SavedPosition>>,
    selections: Mutex<HashMap<(String, TrackKind), i32>>,
    delays: Mutex<HashMap<(String, DelayKind), i64>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_position(&self, media: &MediaRef, position_ms: u64) {
        self.positions
            .lock()
            .expect("fake library positions lock poisoned")
            .insert(
                media.location.clone(),
                SavedPosition {
                    position_ms,
                    updated_at: SystemTime::now(),
                },
            );
    }

    pub fn position(&self, media: &MediaRef) -> Option<u64> {
        self.positions
            .lock()
            .expect("fake library positions lock poisoned")
            .get(&media.location)
            .map(|saved| saved.position_ms)
    }

    pub fn selection(&self, media: &MediaRef, kind: TrackKind) -> Option<i32> {
        self.selections
            .lock()
            .expect("fake library selections lock poisoned")
            .get(&(media.location.clone(), kind))
            .copied()
    }

    pub fn seed_selection(&self, media: &MediaRef, kind: TrackKind, track_id: i32) {
        self.selections
            .lock()
            .expect("fake library selections lock poisoned")
            .insert((media.location.clone(), kind), track_id);
    }

    pub fn delay(&self, media: &MediaRef, kind: DelayKind) -> Option<i64> {
        self.delays
            .lock()
            .expect("fake library delays lock poisoned")
            .get(&(media.location.clone(), kind))
            .copied()
    }
}

impl MediaLibrary for FakeLibrary {
    fn saved_position(&self, media: &MediaRef) -> Option<SavedPosition> {
        self.positions
            .lock()
            .expect("fake library positions lock poisoned")
            .get(&media.location)
            .copied()
    }

    fn set_saved_position(&self, media: &MediaRef, position_ms: u64) {
        self.seed_position(media, position_ms);
    }

    fn saved_track_selection(&self, media: &MediaRef, kind: TrackKind) -> Option<i32> {
        self.selection(media, kind)
    }

    fn set_saved_track_selection(&self, media: &MediaRef, kind: TrackKind, track_id: i32) {
        self.seed_selection(media, kind, track_id);
    }

    fn saved_delay(&self, media: &MediaRef, kind: DelayKind) -> Option<i64> {
        self.delay(media, kind)
    }

    fn set_saved_delay(&self, media: &MediaRef, kind: DelayKind, delay_us: i64) {
        self.delays
            .lock()
            .expect("fake library delays lock poisoned")
            .insert((media.location.clone(), kind), delay_us);
    }
}

pub fn wait_for_message<F>(
    receiver: &mut Receiver<Message>,
    timeout: Duration,
    mut predicate: F,
) -> Message
where
    F: FnMut(&Message) -> bool,
{
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout {
            panic!("timed out waiting for expected message");
        }
        match receiver.try_recv() {
            Ok(message) => {
                if predicate(&message) {
                    return message;
                }
            }
            Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => panic!("bus closed while waiting for message"),
        }
    }
}

pub fn assert_no_message<F>(receiver: &mut Receiver<Message>, timeout: Duration, mut predicate: F)
where
    F: FnMut(&Message) -> bool,
{
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout {
            return;
        }
        match receiver.try_recv() {
            Ok(message) => {
                if predicate(&message) {
                    panic!("received unexpected message: {:?}", message);
                }
            }
            Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => return,
        }
    }
}

pub fn drain_messages(receiver: &mut Receiver<Message>) {
    loop {
        match receiver.try_recv() {
            Ok(_) => {}
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => break,
        }
    }
}
