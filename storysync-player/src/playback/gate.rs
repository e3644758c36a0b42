//! Buffering gate
//!
//! Reference-counted global stall flag. Each track contributes at most one
//! count; a per-track last-known flag suppresses duplicate reports so a
//! repeated `true` or `false` from the same surface never moves the counter.
//! Global buffering holds while the counter is above zero.

use std::collections::HashMap;
use storysync_common::events::TrackId;
use tracing::{debug, trace, warn};

/// Effect of a buffering report on the global flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// Counter moved (or not) without crossing zero
    Unchanged,
    /// 0 → positive: everything must pause
    Stalled,
    /// positive → 0: in-window tracks may resume
    Cleared,
}

#[derive(Debug, Default)]
pub struct BufferingGate {
    count: usize,
    flags: HashMap<TrackId, bool>,
    stalled_since_ms: Option<u64>,
    watchdog_fired: bool,
    violations: u64,
}

impl BufferingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a buffering edge from one track
    pub fn report(&mut self, track_id: TrackId, is_buffering: bool, now_ms: u64) -> GateTransition {
        let previous = self.flags.get(&track_id).copied().unwrap_or(false);
        if previous == is_buffering {
            trace!("Duplicate buffering={} report from {} suppressed", is_buffering, track_id);
            return GateTransition::Unchanged;
        }
        self.flags.insert(track_id, is_buffering);

        if is_buffering {
            self.count += 1;
            debug!("Track {} buffering (gate count {})", track_id, self.count);
            if self.count == 1 {
                self.stalled_since_ms = Some(now_ms);
                self.watchdog_fired = false;
                return GateTransition::Stalled;
            }
            return GateTransition::Unchanged;
        }

        if self.count == 0 {
            // Flag said buffering but the counter disagrees
            self.violations += 1;
            warn!(
                "Buffering gate would go negative for {}; clamped at 0 (violations: {})",
                track_id, self.violations
            );
            return GateTransition::Unchanged;
        }

        self.count -= 1;
        debug!("Track {} no longer buffering (gate count {})", track_id, self.count);
        if self.count == 0 {
            self.stalled_since_ms = None;
            return GateTransition::Cleared;
        }
        GateTransition::Unchanged
    }

    /// Drop a track's contribution (it left its window)
    pub fn clear_track(&mut self, track_id: TrackId, now_ms: u64) -> GateTransition {
        if self.is_track_buffering(track_id) {
            self.report(track_id, false, now_ms)
        } else {
            GateTransition::Unchanged
        }
    }

    /// Forget every track (new registry generation)
    pub fn reset(&mut self) {
        self.count = 0;
        self.flags.clear();
        self.stalled_since_ms = None;
        self.watchdog_fired = false;
    }

    pub fn is_set(&self) -> bool {
        self.count > 0
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_track_buffering(&self, track_id: TrackId) -> bool {
        self.flags.get(&track_id).copied().unwrap_or(false)
    }

    /// Tracks currently holding the gate
    pub fn stalled_tracks(&self) -> Vec<TrackId> {
        let mut tracks: Vec<TrackId> = self
            .flags
            .iter()
            .filter(|(_, buffering)| **buffering)
            .map(|(id, _)| *id)
            .collect();
        tracks.sort();
        tracks
    }

    /// Invariant violations observed (clamped decrements)
    pub fn violations(&self) -> u64 {
        self.violations
    }

    /// Stall duration once it exceeds `threshold_ms`, reported once per episode
    pub fn check_watchdog(&mut self, now_ms: u64, threshold_ms: u64) -> Option<u64> {
        if threshold_ms == 0 || self.watchdog_fired {
            return None;
        }
        let since = self.stalled_since_ms?;
        let stalled_for = now_ms.saturating_sub(since);
        if stalled_for >= threshold_ms {
            self.watchdog_fired = true;
            Some(stalled_for)
        } else {
            None
        }
    }
}
