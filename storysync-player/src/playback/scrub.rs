//! Seek/scrub support
//!
//! [`resync`] re-seeks one track to a scrub target: every track is paused;
//! tracks whose window holds the target are hard-seeked to the aligned
//! local position and parked as paused. Resuming is left to the next tick.
//! [`ScrubGesture`] remembers the play state across a drag gesture.

use super::registry::TrackEntry;
use super::window::WindowOutcome;
use storysync_common::events::TrackState;
use tracing::{debug, warn};

/// Re-seek one track to `target_ms`
pub fn resync(entry: &mut TrackEntry, target_ms: u64) -> WindowOutcome {
    let old = entry.track.state;
    entry.surface.pause();
    entry.surface.set_playback_rate(1.0);

    let (new, left_window) = if entry.track.window_elapsed(target_ms) {
        (TrackState::Ended, true)
    } else if target_ms < entry.track.start_offset_ms {
        if let Err(e) = entry.surface.set_local_position_sec(0.0) {
            debug!("Rewind of {} failed: {}", entry.track.id, e);
        }
        (TrackState::Unstarted, old != TrackState::Unstarted)
    } else {
        let expected = entry.track.expected_local_sec(target_ms);
        match entry.surface.set_local_position_sec(expected) {
            Ok(()) if old == TrackState::Buffering => (TrackState::Buffering, false),
            Ok(()) => (TrackState::Paused, false),
            Err(e) => {
                // Window entry will seek again once the surface accepts it
                debug!("Scrub seek of {} to {:.3}s failed: {}", entry.track.id, expected, e);
                (TrackState::Unstarted, false)
            }
        }
    };

    entry.track.state = new;
    WindowOutcome {
        change: (old != new).then_some((old, new)),
        left_window,
    }
}

/// Play state captured across a drag gesture
#[derive(Debug, Default)]
pub struct ScrubGesture {
    resume_after: Option<bool>,
}

impl ScrubGesture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a gesture; returns false if one is already in flight
    pub fn begin(&mut self, was_playing: bool) -> bool {
        if self.resume_after.is_some() {
            warn!("scrub_begin while a scrub is in flight; keeping the first capture");
            return false;
        }
        self.resume_after = Some(was_playing);
        true
    }

    /// Finish the gesture; returns the captured play state
    pub fn end(&mut self) -> Option<bool> {
        let captured = self.resume_after.take();
        if captured.is_none() {
            warn!("scrub_end without scrub_begin");
        }
        captured
    }

    pub fn in_progress(&self) -> bool {
        self.resume_after.is_some()
    }

    pub fn reset(&mut self) {
        self.resume_after = None;
    }
}
