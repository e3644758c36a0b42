//! Surface event handling, buffering gate effects and the stall watchdog

use super::core::SyncEngine;
use crate::playback::gate::GateTransition;
use crate::playback::surface::{SurfaceEnvelope, SurfaceEvent};
use storysync_common::events::{SyncEvent, TrackId, TrackState};
use storysync_common::time::format_playhead;
use tracing::{debug, info, warn};

impl SyncEngine {
    /// Apply every surface event queued since the last call
    ///
    /// No-op once the receiver has been taken by the scheduler. Returns the
    /// number of envelopes applied.
    pub fn pump_events(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(rx) = self.event_rx.as_mut() {
            while let Ok(envelope) = rx.try_recv() {
                pending.push(envelope);
            }
        }
        let count = pending.len();
        for envelope in pending {
            self.handle_surface_event(envelope);
        }
        count
    }

    /// Apply one surface notification
    ///
    /// Envelopes from an earlier generation (a replaced registry) are
    /// dropped.
    pub fn handle_surface_event(&mut self, envelope: SurfaceEnvelope) {
        if envelope.generation != self.generation {
            debug!(
                "Dropping stale {:?} from {} (generation {} != {})",
                envelope.event, envelope.track_id, envelope.generation, self.generation
            );
            return;
        }

        let id = envelope.track_id;
        let now = self.clock.now_ms();
        let Some(entry) = self.registry.get_mut(id) else {
            debug!("Surface event for unknown track {}", id);
            return;
        };
        if !entry.track.kind.is_media() {
            return;
        }

        match &envelope.event {
            SurfaceEvent::MetadataLoaded { duration_sec } => {
                if self.registry.apply_metadata(id, *duration_sec) {
                    debug!("Track {} duration {:.3}s", id, duration_sec);
                }
                self.refresh_total_duration();
            }
            SurfaceEvent::Ended => {
                // Source ran out before any duration was reported
                if entry.track.duration_ms().is_none() {
                    let position_sec = entry.surface.local_position_sec();
                    if position_sec.is_finite() && position_sec > 0.0 {
                        entry.track.set_duration_ms((position_sec * 1000.0).round() as u64);
                        self.refresh_total_duration();
                    }
                }
            }
            _ => {}
        }

        if let Some(is_buffering) = envelope.event.buffering_signal() {
            self.report_buffering(id, is_buffering, now);
        }
    }

    /// Feed one track's buffering edge into the gate
    pub(super) fn report_buffering(&mut self, id: TrackId, is_buffering: bool, now_ms: u64) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };

        let old = entry.track.state;
        if is_buffering && old == TrackState::Ended {
            debug!("Ignoring buffering report from ended track {}", id);
            return;
        }

        let new = match (is_buffering, old) {
            (true, state) if state.has_started() => TrackState::Buffering,
            (false, TrackState::Buffering) => TrackState::Paused,
            (_, state) => state,
        };
        entry.track.state = new;
        if new != old {
            self.record_change(id, old, new);
        }

        let transition = self.gate.report(id, is_buffering, now_ms);
        self.on_gate_transition(transition);
    }

    /// Global effects of the gate crossing zero
    pub(super) fn on_gate_transition(&mut self, transition: GateTransition) {
        match transition {
            GateTransition::Unchanged => {}
            GateTransition::Stalled => {
                info!(
                    "Buffering at {}: pausing all tracks",
                    format_playhead(self.playhead_ms)
                );
                for entry in self.registry.iter_mut() {
                    entry.surface.pause();
                }
                self.shared.set_buffering(true);
                self.evaluate_windows();
                self.emit(SyncEvent::BufferingChanged {
                    is_buffering: true,
                    stalled_tracks: self.gate.count(),
                    timestamp: chrono::Utc::now(),
                });
            }
            GateTransition::Cleared => {
                info!(
                    "Buffering cleared at {}",
                    format_playhead(self.playhead_ms)
                );
                self.shared.set_buffering(false);
                self.last_tick_ms = Some(self.clock.now_ms());
                self.emit(SyncEvent::BufferingChanged {
                    is_buffering: false,
                    stalled_tracks: 0,
                    timestamp: chrono::Utc::now(),
                });
                if self.toggle.is_playing() {
                    self.evaluate_windows();
                }
            }
        }
    }

    /// Grow the total duration from newly known track durations
    pub(super) fn refresh_total_duration(&mut self) {
        if let Some((old, new)) = self.registry.recompute_total_duration() {
            info!(
                "Total duration {} -> {}",
                format_playhead(old),
                format_playhead(new)
            );
            self.shared.set_total_duration_ms(new);
            self.emit(SyncEvent::TotalDurationChanged {
                old_duration_ms: old,
                new_duration_ms: new,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Detection-only: report a gate held past the warning threshold
    pub(super) fn check_watchdog(&mut self, now_ms: u64) {
        let threshold = self.config.timeline.stall_warning_ms;
        if let Some(stalled_for_ms) = self.gate.check_watchdog(now_ms, threshold) {
            let stalled_tracks = self.gate.stalled_tracks();
            warn!(
                "[WATCHDOG] Buffering held for {}ms by {} track(s) at {}",
                stalled_for_ms,
                stalled_tracks.len(),
                format_playhead(self.playhead_ms)
            );
            self.emit(SyncEvent::StallWatchdog {
                stalled_for_ms,
                stalled_tracks,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}
