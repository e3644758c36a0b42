//! Engine construction, population and lifecycle

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::playback::clock::Clock;
use crate::playback::drift::DriftCorrector;
use crate::playback::gate::BufferingGate;
use crate::playback::phase::{OverlayState, PhaseController};
use crate::playback::registry::MediaRegistry;
use crate::playback::scrub::ScrubGesture;
use crate::playback::source::{DirectSourceResolver, SourceResolver};
use crate::playback::surface::{
    ColorSurface, PlaybackSurface, SurfaceEnvelope, SurfaceEventSender, SurfaceFactory,
};
use crate::playback::track::{plan_tracks, Track};
use crate::state::SharedSyncState;
use std::sync::Arc;
use storysync_common::events::{PlayToggle, SyncEvent, TrackId, TrackKind, TrackState};
use storysync_common::manifest::{Chapter, Manifest, DEFAULT_BACKGROUND_COLOR};
use storysync_common::ViewportClass;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Multi-track synchronized playback engine
///
/// Single owner of the registry, buffering gate and playhead. All mutation
/// happens through `&mut self`, either from tests driving [`SyncEngine::tick`]
/// by hand or from the scheduler task. Surface callbacks arrive on a channel
/// and are applied between ticks, so no track ever sees a half-applied
/// update.
pub struct SyncEngine {
    pub(super) config: SyncConfig,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) factory: Arc<dyn SurfaceFactory>,
    pub(super) resolver: Arc<dyn SourceResolver>,

    /// Published outputs for readers off the engine task
    pub(super) shared: Arc<SharedSyncState>,

    pub(super) registry: MediaRegistry,
    pub(super) gate: BufferingGate,
    pub(super) drift: DriftCorrector,
    pub(super) phase: PhaseController,
    pub(super) gesture: ScrubGesture,

    pub(super) manifest: Option<Manifest>,
    pub(super) viewport: ViewportClass,

    /// Registry generation; surface events from older generations are dropped
    pub(super) generation: u64,
    pub(super) event_tx: mpsc::UnboundedSender<SurfaceEnvelope>,
    /// Taken by the scheduler when it runs the engine
    pub(super) event_rx: Option<mpsc::UnboundedReceiver<SurfaceEnvelope>>,

    pub(super) toggle: PlayToggle,
    pub(super) playhead_ms: u64,
    pub(super) last_tick_ms: Option<u64>,
    pub(super) finished: bool,

    /// Last `(playhead, total)` pushed to listeners
    pub(super) published: Option<(u64, u64)>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, clock: Arc<dyn Clock>, factory: Arc<dyn SurfaceFactory>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SharedSyncState::new(config.events.bus_capacity));

        Self {
            drift: DriftCorrector::new(&config.drift),
            phase: PhaseController::new(config.timeline.outro_offset_ms),
            config,
            clock,
            factory,
            resolver: Arc::new(DirectSourceResolver),
            shared,
            registry: MediaRegistry::new(),
            gate: BufferingGate::new(),
            gesture: ScrubGesture::new(),
            manifest: None,
            viewport: ViewportClass::Desktop,
            generation: 0,
            event_tx,
            event_rx: Some(event_rx),
            toggle: PlayToggle::Paused,
            playhead_ms: 0,
            last_tick_ms: None,
            finished: false,
            published: None,
        }
    }

    /// Replace the source resolver (defaults to [`DirectSourceResolver`])
    pub fn with_source_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Build tracks for the viewport and register them
    ///
    /// Viewport selection happens once here; a second call is rejected
    /// (use [`SyncEngine::replay`] to rebuild).
    ///
    /// Returns the number of registered tracks.
    pub fn populate(&mut self, manifest: Manifest, viewport: ViewportClass) -> Result<usize> {
        if self.manifest.is_some() {
            return Err(Error::InvalidState(
                "engine already populated; use replay() to rebuild".to_string(),
            ));
        }
        self.manifest = Some(manifest);
        self.viewport = viewport;
        self.build_generation().inspect_err(|_| {
            self.manifest = None;
        })
    }

    /// Create and register every track of the current generation
    pub(super) fn build_generation(&mut self) -> Result<usize> {
        let plans = {
            let manifest = self
                .manifest
                .as_ref()
                .ok_or_else(|| Error::InvalidState("no manifest loaded".to_string()))?;
            plan_tracks(manifest, self.viewport)?
        };

        let now = self.clock.now_ms();
        let mut not_ready = Vec::new();

        for plan in plans {
            let track = plan.track;
            let surface: Box<dyn PlaybackSurface> = if track.kind.is_media() {
                let url = self.resolver.resolve(&track.source, self.viewport);
                let sender = SurfaceEventSender::new(track.id, self.generation, self.event_tx.clone());
                self.factory.create_surface(&track, url.as_deref(), sender)
            } else {
                Box::new(ColorSurface::new())
            };

            if track.kind.is_media() && !surface.is_ready() {
                not_ready.push(track.id);
            }

            debug!(
                "Registering {} {} at {}ms (master: {})",
                track.kind,
                track.source.label(),
                track.start_offset_ms,
                plan.is_master
            );
            self.registry.register(track, surface, plan.is_master);
        }

        if self.config.timeline.gate_initial_load {
            for id in not_ready {
                self.report_buffering(id, true, now);
            }
        }

        if self.registry.master_id().is_none() {
            warn!("No video track for {} viewport; playhead runs on the clock", self.viewport);
        }

        self.refresh_total_duration();
        info!(
            "Populated {} tracks for {} viewport (generation {})",
            self.registry.len(),
            self.viewport,
            self.generation
        );
        Ok(self.registry.len())
    }

    /// Begin playback from the current playhead
    pub fn start(&mut self) {
        if self.registry.is_empty() {
            warn!("start() called with no tracks registered");
        }
        self.last_tick_ms = Some(self.clock.now_ms());
        self.phase.set_paused_by_user(false);
        self.set_toggle(PlayToggle::Playing);
        self.evaluate_windows();
        self.publish_playhead();
    }

    /// Tear down every track and rebuild from the manifest
    ///
    /// Tracks are recreated with fresh surfaces under a new generation, so
    /// callbacks still in flight from the old surfaces are ignored. The
    /// known total duration carries over.
    pub fn replay(&mut self) -> Result<()> {
        if self.manifest.is_none() {
            return Err(Error::InvalidState("replay() before populate()".to_string()));
        }

        let total = self.registry.total_duration_ms();
        let was_buffering = self.gate.is_set();
        info!(
            "Replay: recreating {} tracks (generation {} -> {})",
            self.registry.len(),
            self.generation,
            self.generation + 1
        );

        self.registry.clear();
        self.gate.reset();
        self.phase.reset();
        self.gesture.reset();

        if was_buffering {
            self.shared.set_buffering(false);
            self.emit(SyncEvent::BufferingChanged {
                is_buffering: false,
                stalled_tracks: 0,
                timestamp: chrono::Utc::now(),
            });
        }

        self.generation += 1;
        self.shared.set_generation(self.generation);
        self.registry.seed_total_duration(total);
        self.playhead_ms = 0;
        self.finished = false;
        self.last_tick_ms = Some(self.clock.now_ms());

        self.build_generation()?;

        self.emit(SyncEvent::Replayed {
            generation: self.generation,
            timestamp: chrono::Utc::now(),
        });

        self.set_toggle(PlayToggle::Playing);
        self.evaluate_windows();
        self.update_phase();
        self.publish_playhead();
        Ok(())
    }

    /// Hand the surface-event receiver to an external loop
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SurfaceEnvelope>> {
        self.event_rx.take()
    }

    pub(super) fn emit(&self, event: SyncEvent) {
        self.shared.broadcast_event(event);
    }

    pub(super) fn set_toggle(&mut self, new_state: PlayToggle) {
        let old_state = self.toggle;
        if old_state == new_state {
            return;
        }
        self.toggle = new_state;
        self.shared.set_playing(new_state.is_playing());
        info!("Playback {} -> {}", old_state, new_state);
        self.emit(SyncEvent::PlaybackToggled {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn record_change(&self, track_id: TrackId, old_state: TrackState, new_state: TrackState) {
        debug!(
            "Track {} {} -> {} at {}ms",
            track_id, old_state, new_state, self.playhead_ms
        );
        self.emit(SyncEvent::TrackStateChanged {
            track_id,
            old_state,
            new_state,
            playhead_ms: self.playhead_ms,
            timestamp: chrono::Utc::now(),
        });
    }

    // ----- accessors -----

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn shared(&self) -> Arc<SharedSyncState> {
        Arc::clone(&self.shared)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.subscribe_events()
    }

    pub fn current_playhead_ms(&self) -> u64 {
        self.playhead_ms
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.registry.total_duration_ms()
    }

    pub fn is_globally_buffering(&self) -> bool {
        self.gate.is_set()
    }

    pub fn buffering_count(&self) -> usize {
        self.gate.count()
    }

    pub fn play_toggle(&self) -> PlayToggle {
        self.toggle
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_scrubbing(&self) -> bool {
        self.gesture.in_progress()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn viewport(&self) -> ViewportClass {
        self.viewport
    }

    pub fn master_track_id(&self) -> Option<TrackId> {
        self.registry.master_id()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.registry.get(id).map(|entry| &entry.track)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.registry.iter().map(|entry| &entry.track)
    }

    /// Local position of a track's surface, in seconds
    pub fn track_position_sec(&self, id: TrackId) -> Option<f64> {
        self.registry.get(id).map(|entry| entry.surface.local_position_sec())
    }

    /// Track whose default source is `file`
    pub fn track_by_file(&self, file: &str) -> Option<&Track> {
        self.tracks().find(|track| track.source.file.as_deref() == Some(file))
    }

    /// Color of the latest background that has started
    pub fn background_color(&self) -> &str {
        self.tracks()
            .filter(|track| track.kind == TrackKind::BackgroundColor)
            .filter(|track| track.start_offset_ms <= self.playhead_ms)
            .max_by_key(|track| track.start_offset_ms)
            .and_then(|track| track.color.as_deref())
            .unwrap_or(DEFAULT_BACKGROUND_COLOR)
    }

    /// Chapter containing the playhead
    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.manifest
            .as_ref()
            .and_then(|manifest| manifest.chapter_at(self.playhead_ms))
    }

    pub fn overlay(&self) -> OverlayState {
        self.phase.overlay()
    }
}
