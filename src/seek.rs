//! Seek position reconciliation.
//!
//! After a seek the engine keeps reporting positions from the pre-seek
//! trajectory for an unbounded but short window before settling at the
//! target. Displaying those raw reports makes the progress indicator jump
//! backward and forward. While a seek is in flight this module reports the
//! requested position instead, and hands reporting back to the engine only
//! once its reports have demonstrably crossed to the target side. No
//! timeout is involved; engines settle at different speeds.

/// Reconciles raw engine position reports against an in-flight seek.
#[derive(Debug, Default)]
pub struct SeekReconciler {
    /// Position most recently requested via seek, if one is in flight.
    forced_time_ms: Option<u64>,
    /// Raw engine position captured at the moment the seek was issued.
    last_observed_time_ms: Option<u64>,
    /// Last externally known position for the loaded media. Used when the
    /// engine reports 0, which means "unknown" right after a load.
    fallback_time_ms: Option<u64>,
}

impl SeekReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears any in-flight reconciliation, keeping `fallback_time_ms` as
    /// the known position for the newly loaded media.
    pub fn reset(&mut self, fallback_time_ms: Option<u64>) {
        self.forced_time_ms = None;
        self.last_observed_time_ms = None;
        self.fallback_time_ms = fallback_time_ms;
    }

    /// Starts reconciling a seek to `target_ms`. `observed_ms` is the raw
    /// engine position just before the seek was issued. A second seek
    /// before settlement restarts reconciliation; the latest seek wins.
    pub fn begin_seek(&mut self, target_ms: u64, observed_ms: u64) {
        self.forced_time_ms = Some(target_ms);
        self.last_observed_time_ms = Some(observed_ms);
        self.fallback_time_ms = Some(target_ms);
    }

    pub fn is_reconciling(&self) -> bool {
        self.forced_time_ms.is_some()
    }

    /// Maps one raw engine report to the position shown to subscribers.
    ///
    /// While a seek is in flight this returns the forced time. Settlement:
    /// for a backward seek, the first raw report at or below the target
    /// (or an overshoot past the pre-seek point); for a forward seek, the
    /// first raw report past the target. The settling report itself still
    /// returns the forced time; raw reporting resumes with the next call.
    pub fn reconcile(&mut self, raw_ms: u64) -> u64 {
        if let (Some(forced), Some(last)) = (self.forced_time_ms, self.last_observed_time_ms) {
            let settled = if last > forced {
                raw_ms <= forced || raw_ms > last
            } else {
                raw_ms > forced
            };
            if settled {
                self.forced_time_ms = None;
                self.last_observed_time_ms = None;
            }
            return forced;
        }
        if raw_ms == 0 {
            if let Some(fallback) = self.fallback_time_ms {
                return fallback;
            }
        }
        raw_ms
    }
}
