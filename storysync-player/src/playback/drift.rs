//! Drift correction
//!
//! Proportional controller on playback rate. A track running ahead of the
//! playhead is slowed, one running behind is sped up; inside the tolerance
//! the rate is pinned to 1.0. Steady-state drift is never fixed by seeking;
//! hard re-seeks belong to scrub and window entry.

use super::registry::TrackEntry;
use crate::config::DriftConfig;
use storysync_common::events::TrackState;
use tracing::trace;

/// Minimum rate change worth pushing to a surface
const RATE_EPSILON: f64 = 1e-3;

/// Slack on the tolerance comparison for float subtraction error
const TOLERANCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct DriftCorrector {
    tolerance_sec: f64,
    gain: f64,
    min_rate: f64,
    max_rate: f64,
}

impl DriftCorrector {
    pub fn new(config: &DriftConfig) -> Self {
        Self {
            tolerance_sec: config.tolerance_sec,
            gain: config.gain,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
        }
    }

    /// Rate that pulls `local_sec` toward `expected_sec`
    pub fn target_rate(&self, local_sec: f64, expected_sec: f64) -> f64 {
        let drift = local_sec - expected_sec;
        if !drift.is_finite() || drift.abs() <= self.tolerance_sec + TOLERANCE_EPSILON {
            return 1.0;
        }
        (1.0 - drift * self.gain).clamp(self.min_rate, self.max_rate)
    }

    /// Adjust one track against the tick's playhead snapshot
    ///
    /// Applies only to active, non-master media tracks. Returns the new
    /// rate when it was changed.
    pub fn correct(&self, entry: &mut TrackEntry, playhead_ms: u64) -> Option<f64> {
        let track = &entry.track;
        if track.is_master || track.state != TrackState::Active || !track.kind.is_media() {
            return None;
        }

        let expected = track.expected_local_sec(playhead_ms);
        let local = entry.surface.local_position_sec();
        let rate = self.target_rate(local, expected);

        if (entry.surface.playback_rate() - rate).abs() > RATE_EPSILON {
            trace!(
                "Drift {:.3}s on {}: rate {:.3}",
                local - expected,
                track.id,
                rate
            );
            entry.surface.set_playback_rate(rate);
            Some(rate)
        } else {
            None
        }
    }
}

impl Default for DriftCorrector {
    fn default() -> Self {
        Self::new(&DriftConfig::default())
    }
}
