//! Timeline phase controller
//!
//! Derives overlay state from the playhead. The outro window is the tail
//! `[total - offset, total]`; entering it fires one edge, and the latch
//! re-arms when the playhead leaves (a scrub back), so re-entry fires again.

use serde::Serialize;

/// Whether `playhead_ms` lies in the outro window
pub fn in_outro_window(playhead_ms: u64, total_duration_ms: u64, outro_offset_ms: u64) -> bool {
    total_duration_ms > 0 && playhead_ms >= total_duration_ms.saturating_sub(outro_offset_ms)
}

/// Edge produced by a phase update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEdge {
    OutroEntered,
    OutroExited,
}

/// Overlay visibility for the presentation layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverlayState {
    /// Final outro overlay (shown for as long as the outro window holds)
    pub outro_overlay: bool,
    /// User paused the timeline
    pub pause_overlay: bool,
    /// Early outro hint; shown in the outro window until the program
    /// finishes, hidden while the user has paused
    pub early_outro: bool,
}

#[derive(Debug, Clone)]
pub struct PhaseController {
    outro_offset_ms: u64,
    in_outro: bool,
    paused_by_user: bool,
    finished: bool,
}

impl PhaseController {
    pub fn new(outro_offset_ms: u64) -> Self {
        Self {
            outro_offset_ms,
            in_outro: false,
            paused_by_user: false,
            finished: false,
        }
    }

    /// Evaluate against the current playhead; returns the edge, if any
    pub fn update(&mut self, playhead_ms: u64, total_duration_ms: u64) -> Option<PhaseEdge> {
        let inside = in_outro_window(playhead_ms, total_duration_ms, self.outro_offset_ms);
        match (self.in_outro, inside) {
            (false, true) => {
                self.in_outro = true;
                Some(PhaseEdge::OutroEntered)
            }
            (true, false) => {
                self.in_outro = false;
                Some(PhaseEdge::OutroExited)
            }
            _ => None,
        }
    }

    pub fn in_outro(&self) -> bool {
        self.in_outro
    }

    pub fn set_paused_by_user(&mut self, paused: bool) {
        self.paused_by_user = paused;
    }

    /// The program reached its end; a scrub back or a replay clears it
    pub fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    pub fn overlay(&self) -> OverlayState {
        OverlayState {
            outro_overlay: self.in_outro,
            pause_overlay: self.paused_by_user && !self.in_outro,
            early_outro: self.in_outro && !self.paused_by_user && !self.finished,
        }
    }

    /// Clear every latch (full replay)
    pub fn reset(&mut self) {
        self.in_outro = false;
        self.paused_by_user = false;
        self.finished = false;
    }
}
