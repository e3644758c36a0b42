//! Playback window controller
//!
//! Per-track state machine re-evaluated on every tick against one playhead
//! snapshot. Failed play or seek requests leave the state unchanged so the
//! same transition is attempted again on the next tick.
//!
//! | From                 | Condition                                  | To        |
//! |----------------------|--------------------------------------------|-----------|
//! | any                  | window elapsed                             | ended     |
//! | any                  | playhead before start                      | unstarted |
//! | active               | gate set or toggle off                     | paused    |
//! | unstarted / ended    | in window, can play, surface ready         | active    |
//! | paused               | in window, can play, surface ready         | active    |

use super::registry::TrackEntry;
use storysync_common::events::TrackState;
use tracing::{debug, trace};

/// Inputs shared by every track within one tick
#[derive(Debug, Clone, Copy)]
pub struct WindowContext {
    pub playhead_ms: u64,
    pub gate_set: bool,
    /// Timeline toggle is on and the program has not finished
    pub toggle_playing: bool,
}

impl WindowContext {
    pub fn can_play(&self) -> bool {
        self.toggle_playing && !self.gate_set
    }
}

/// Result of evaluating one track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowOutcome {
    /// `(old, new)` when the state changed
    pub change: Option<(TrackState, TrackState)>,
    /// Track is now outside its window; its buffering flag must be released
    pub left_window: bool,
}

/// Advance one track's state machine
pub fn evaluate(entry: &mut TrackEntry, ctx: &WindowContext) -> WindowOutcome {
    let old = entry.track.state;
    let t = ctx.playhead_ms;

    if entry.track.window_elapsed(t) {
        if old != TrackState::Ended {
            entry.surface.pause();
            entry.surface.set_playback_rate(1.0);
            entry.track.state = TrackState::Ended;
        }
        return outcome(old, entry.track.state, true);
    }

    if t < entry.track.start_offset_ms {
        if old != TrackState::Unstarted {
            entry.surface.pause();
            if let Err(e) = entry.surface.set_local_position_sec(0.0) {
                debug!("Rewind of {} failed: {}", entry.track.id, e);
            }
            entry.track.state = TrackState::Unstarted;
        }
        // A track that never started keeps any initial-load hold it owns
        return outcome(old, entry.track.state, old != TrackState::Unstarted);
    }

    if !ctx.can_play() {
        if old == TrackState::Active {
            entry.track.state = TrackState::Paused;
        }
        if !entry.surface.is_paused() {
            entry.surface.pause();
        }
        return outcome(old, entry.track.state, false);
    }

    match old {
        TrackState::Unstarted | TrackState::Ended => {
            if !entry.surface.is_ready() {
                trace!("Track {} waiting for readiness", entry.track.id);
                return outcome(old, old, false);
            }
            // Re-align before play so no stale frame from a previous position shows
            let expected = entry.track.expected_local_sec(t);
            if let Err(e) = entry.surface.set_local_position_sec(expected) {
                debug!("Seek of {} to {:.3}s failed, retrying next tick: {}", entry.track.id, expected, e);
                return outcome(old, old, false);
            }
            request_play(entry, old)
        }
        TrackState::Paused => {
            if !entry.surface.is_ready() {
                return outcome(old, old, false);
            }
            request_play(entry, old)
        }
        TrackState::Active => {
            if entry.surface.is_paused() {
                // Earlier play request did not stick (e.g. autoplay rejection)
                if let Err(e) = entry.surface.play() {
                    trace!("Play retry for {} failed: {}", entry.track.id, e);
                }
            }
            outcome(old, old, false)
        }
        // Waits for its own resume signal
        TrackState::Buffering => outcome(old, old, false),
    }
}

fn request_play(entry: &mut TrackEntry, old: TrackState) -> WindowOutcome {
    entry.surface.set_playback_rate(1.0);
    match entry.surface.play() {
        Ok(()) => {
            entry.track.state = TrackState::Active;
            outcome(old, TrackState::Active, false)
        }
        Err(e) => {
            debug!("Play of {} failed, retrying next tick: {}", entry.track.id, e);
            outcome(old, old, false)
        }
    }
}

fn outcome(old: TrackState, new: TrackState, left_window: bool) -> WindowOutcome {
    WindowOutcome {
        change: (old != new).then_some((old, new)),
        left_window,
    }
}
