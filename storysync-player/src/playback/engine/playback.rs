//! Tick loop body, play/pause toggle and scrub operations

use super::core::SyncEngine;
use crate::playback::scrub;
use crate::playback::phase::PhaseEdge;
use crate::playback::window::{self, WindowContext, WindowOutcome};
use storysync_common::events::{PlayToggle, SyncEvent, TrackId};
use storysync_common::time::format_playhead;
use tracing::{debug, info};

impl SyncEngine {
    /// Run one scheduling tick
    ///
    /// Order: apply pending surface events, advance the playhead, evaluate
    /// every track's window against that single snapshot, correct drift,
    /// update the phase, publish.
    ///
    /// Returns the playhead used for this tick.
    pub fn tick(&mut self) -> u64 {
        self.pump_events();

        let now = self.clock.now_ms();
        let elapsed = self.last_tick_ms.map_or(0, |last| now.saturating_sub(last));
        self.last_tick_ms = Some(now);

        self.refresh_total_duration();

        if self.is_advancing() {
            let candidate = self.registry.playhead_ms(self.playhead_ms + elapsed);
            // Monotonic while playing
            self.playhead_ms = self.playhead_ms.max(candidate);

            let total = self.registry.total_duration_ms();
            if total > 0 && self.playhead_ms >= total {
                self.playhead_ms = total;
                self.finish();
            }
        }

        self.evaluate_windows();
        self.correct_drift();
        self.update_phase();
        self.check_watchdog(now);
        self.publish_playhead();

        self.playhead_ms
    }

    /// Flip the timeline-level play/pause toggle
    ///
    /// Pausing is applied to the surfaces immediately. After the program has
    /// finished, playing again requires a scrub back or a replay.
    pub fn toggle_play_pause(&mut self) -> PlayToggle {
        let new_state = match self.toggle {
            PlayToggle::Playing => PlayToggle::Paused,
            PlayToggle::Paused => PlayToggle::Playing,
        };

        if new_state.is_playing() && self.finished {
            info!("Program finished; scrub back or replay to play again");
            return self.toggle;
        }

        self.phase.set_paused_by_user(!new_state.is_playing());
        self.last_tick_ms = Some(self.clock.now_ms());
        self.set_toggle(new_state);
        self.evaluate_windows();
        self.publish_playhead();
        self.toggle
    }

    /// Jump the playhead and re-seek every track
    ///
    /// The target is clamped to `[0, total]`. Tracks are left paused at the
    /// new position; if the toggle is on, the next tick resumes the ones
    /// whose window holds the target.
    ///
    /// Returns the clamped playhead.
    pub fn scrub(&mut self, target_ms: u64) -> u64 {
        let total = self.registry.total_duration_ms();
        let target = target_ms.min(total);
        let now = self.clock.now_ms();

        self.playhead_ms = target;
        // Next tick must not add the time spent before the scrub
        self.last_tick_ms = Some(now);
        if target < total || total == 0 {
            self.finished = false;
            self.phase.set_finished(false);
        }

        let mut changes = Vec::new();
        let mut left_window = Vec::new();
        for entry in self.registry.iter_mut() {
            let outcome = scrub::resync(entry, target);
            collect_outcome(entry.track.id, outcome, &mut changes, &mut left_window);
        }
        self.apply_window_results(changes, left_window, now);

        debug!("Scrubbed to {} (requested {}ms)", format_playhead(target), target_ms);
        self.update_phase();
        self.publish_playhead();
        target
    }

    /// Start a drag gesture: remember the play state and pause
    pub fn scrub_begin(&mut self) {
        let was_playing = self.toggle.is_playing();
        if !self.gesture.begin(was_playing) {
            return;
        }
        if was_playing {
            self.set_toggle(PlayToggle::Paused);
            self.evaluate_windows();
        }
    }

    /// Finish a drag gesture and restore the captured play state
    pub fn scrub_end(&mut self) {
        let Some(was_playing) = self.gesture.end() else {
            return;
        };
        if was_playing && !self.finished {
            self.last_tick_ms = Some(self.clock.now_ms());
            self.set_toggle(PlayToggle::Playing);
            self.evaluate_windows();
        }
    }

    pub(super) fn is_advancing(&self) -> bool {
        self.toggle.is_playing()
            && !self.gate.is_set()
            && !self.gesture.in_progress()
            && !self.finished
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.phase.set_finished(true);
        let total = self.registry.total_duration_ms();
        info!("Program finished at {}", format_playhead(total));
        self.emit(SyncEvent::ProgramFinished {
            total_duration_ms: total,
            timestamp: chrono::Utc::now(),
        });
        self.set_toggle(PlayToggle::Paused);
    }

    /// Run the window controller for every track on the current playhead
    pub(super) fn evaluate_windows(&mut self) {
        let ctx = WindowContext {
            playhead_ms: self.playhead_ms,
            gate_set: self.gate.is_set(),
            toggle_playing: self.toggle.is_playing() && !self.finished,
        };

        let mut changes = Vec::new();
        let mut left_window = Vec::new();
        for entry in self.registry.iter_mut() {
            let outcome = window::evaluate(entry, &ctx);
            collect_outcome(entry.track.id, outcome, &mut changes, &mut left_window);
        }
        self.apply_window_results(changes, left_window, self.clock.now_ms());
    }

    fn apply_window_results(
        &mut self,
        changes: Vec<(TrackId, WindowOutcome)>,
        left_window: Vec<TrackId>,
        now_ms: u64,
    ) {
        for (id, outcome) in changes {
            if let Some((old, new)) = outcome.change {
                self.record_change(id, old, new);
            }
        }
        for id in left_window {
            if self.gate.is_track_buffering(id) {
                debug!("Track {} left its window while buffering; releasing", id);
                let transition = self.gate.clear_track(id, now_ms);
                self.on_gate_transition(transition);
            }
        }
    }

    fn correct_drift(&mut self) {
        let playhead = self.playhead_ms;
        for entry in self.registry.iter_mut() {
            self.drift.correct(entry, playhead);
        }
    }

    pub(super) fn update_phase(&mut self) {
        let total = self.registry.total_duration_ms();
        match self.phase.update(self.playhead_ms, total) {
            Some(PhaseEdge::OutroEntered) => {
                info!("Entered outro window at {}", format_playhead(self.playhead_ms));
                self.emit(SyncEvent::OutroWindowEntered {
                    playhead_ms: self.playhead_ms,
                    timestamp: chrono::Utc::now(),
                });
            }
            Some(PhaseEdge::OutroExited) => {
                debug!("Left outro window at {}", format_playhead(self.playhead_ms));
                self.emit(SyncEvent::OutroWindowExited {
                    playhead_ms: self.playhead_ms,
                    timestamp: chrono::Utc::now(),
                });
            }
            None => {}
        }
        self.shared.set_outro_window(self.phase.in_outro());
    }

    pub(super) fn publish_playhead(&mut self) {
        let total = self.registry.total_duration_ms();
        let snapshot = (self.playhead_ms, total);
        if self.published == Some(snapshot) {
            return;
        }
        self.published = Some(snapshot);
        self.shared.set_playhead_ms(self.playhead_ms);
        self.emit(SyncEvent::PlayheadUpdated {
            playhead_ms: self.playhead_ms,
            total_duration_ms: total,
            timestamp: chrono::Utc::now(),
        });
    }
}

fn collect_outcome(
    id: TrackId,
    outcome: WindowOutcome,
    changes: &mut Vec<(TrackId, WindowOutcome)>,
    left_window: &mut Vec<TrackId>,
) {
    if outcome.change.is_some() {
        changes.push((id, outcome));
    }
    if outcome.left_window {
        left_window.push(id);
    }
}
