//! Resume-point decision workflow.
//!
//! Decides, for a media about to load, whether playback starts from a
//! saved position, from zero, or must wait for a user decision. Two saved
//! sources exist: the library-recorded per-media position and a transient
//! "last stopped elsewhere" value. The more recently updated one wins; an
//! exact tie goes to the transient value. The transient value is consumed
//! the first time it is evaluated for a load.

use std::time::SystemTime;

use log::debug;

use crate::media_library::SavedPosition;
use crate::protocol::MediaRef;

/// Whether resuming from a saved position needs user confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Resume silently whenever a saved position exists.
    #[default]
    Always,
    /// Ask before resuming.
    Ask,
    /// Ignore saved positions and always start from zero.
    Never,
}

/// Caller's answer to a pending resume decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    Resume,
    FromStart,
}

/// Result of evaluating the decision table for one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Start playback at this position (0 means from the beginning).
    Start { position_ms: u64 },
    /// Suspend the load until the caller answers.
    AskUser { position_ms: u64 },
    /// The media is already loaded in this session; keep the engine
    /// position untouched.
    KeepCurrent,
}

#[derive(Debug)]
struct TransientPosition {
    media: MediaRef,
    position_ms: u64,
    recorded_at: SystemTime,
}

/// Gate evaluated once per media load.
#[derive(Debug)]
pub struct ResumeGate {
    policy: ResumePolicy,
    transient: Option<TransientPosition>,
}

impl ResumeGate {
    pub fn new(policy: ResumePolicy) -> Self {
        Self {
            policy,
            transient: None,
        }
    }

    /// Records a position handed over from outside the session, e.g. a
    /// stop in another playback surface.
    pub fn set_transient(&mut self, media: MediaRef, position_ms: u64, recorded_at: SystemTime) {
        self.transient = Some(TransientPosition {
            media,
            position_ms,
            recorded_at,
        });
    }

    /// Evaluates the decision table, first match wins. The transient value
    /// is consumed by this call whether or not it contributed, so it can
    /// never leak into a later load of a different media.
    pub fn evaluate(
        &mut self,
        media: &MediaRef,
        from_start: bool,
        continuing_current: bool,
        library_saved: Option<SavedPosition>,
    ) -> ResumeOutcome {
        let transient = self.transient.take();

        if from_start {
            return ResumeOutcome::Start { position_ms: 0 };
        }
        if continuing_current {
            return ResumeOutcome::KeepCurrent;
        }
        if self.policy == ResumePolicy::Never {
            return ResumeOutcome::Start { position_ms: 0 };
        }

        let transient = transient
            .filter(|t| t.media == *media && t.position_ms > 0)
            .map(|t| SavedPosition {
                position_ms: t.position_ms,
                updated_at: t.recorded_at,
            });
        let library_saved = library_saved.filter(|saved| saved.position_ms > 0);

        let chosen = match (transient, library_saved) {
            (Some(t), Some(l)) => {
                // Recency decides; the transient wins an exact tie.
                if l.updated_at > t.updated_at {
                    debug!(
                        "ResumeGate: library position {}ms is newer than transient {}ms",
                        l.position_ms, t.position_ms
                    );
                    Some(l)
                } else {
                    Some(t)
                }
            }
            (Some(t), None) => Some(t),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        };

        match chosen {
            Some(saved) if self.policy == ResumePolicy::Ask => ResumeOutcome::AskUser {
                position_ms: saved.position_ms,
            },
            Some(saved) => ResumeOutcome::Start {
                position_ms: saved.position_ms,
            },
            None => ResumeOutcome::Start { position_ms: 0 },
        }
    }
}
