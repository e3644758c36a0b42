//! Test harness for SyncEngine integration tests
//!
//! Provides TestRig wrapper with:
//! - ManualClock so every tick is deterministic
//! - SimulatedSurfaceFactory with per-file media durations
//! - Lookup of tracks and surfaces by source file

use std::sync::Arc;
use storysync_common::events::{SyncEvent, TrackId, TrackState};
use storysync_common::{Manifest, ViewportClass};
use storysync_player::playback::{Clock, ManualClock, SimulatedHandle, SimulatedSurfaceFactory};
use storysync_player::{SyncConfig, SyncEngine};
use tokio::sync::broadcast;

/// One display refresh at ~60 Hz
pub const TICK_MS: u64 = 16;

/// Engine wired to a manual clock and simulated surfaces
pub struct TestRig {
    pub clock: Arc<ManualClock>,
    pub factory: Arc<SimulatedSurfaceFactory>,
    pub engine: SyncEngine,
}

impl TestRig {
    /// Desktop viewport, default config, every surface ready at creation
    pub fn new(manifest_json: &str) -> Self {
        Self::build(manifest_json, ViewportClass::Desktop, SyncConfig::default(), true)
    }

    pub fn build(manifest_json: &str, viewport: ViewportClass, config: SyncConfig, ready: bool) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let factory = Arc::new(
            SimulatedSurfaceFactory::new(clock.clone())
                .ready_on_create(ready)
                .media_duration("a.mp4", 10.0)
                .media_duration("b.mp3", 3.0)
                .media_duration("c.mp3", 15.0)
                .media_duration("wide.mp4", 20.0)
                .media_duration("tall.mp4", 20.0)
                .media_duration("bed.mp3", 20.0)
                .media_duration("narration.mp3", 5.0),
        );

        let manifest = Manifest::from_json_str(manifest_json).expect("test manifest must parse");
        let mut engine = SyncEngine::new(config, clock.clone(), factory.clone());
        engine
            .populate(manifest, viewport)
            .expect("test manifest must populate");

        Self {
            clock,
            factory,
            engine,
        }
    }

    /// Populated, started, with metadata already applied
    pub fn started(manifest_json: &str) -> Self {
        let mut rig = Self::new(manifest_json);
        rig.engine.pump_events();
        rig.engine.start();
        rig
    }

    /// Advance the clock by `ms`, ticking every refresh; returns the playhead
    pub fn advance(&mut self, ms: u64) -> u64 {
        let mut remaining = ms;
        while remaining > 0 {
            let step = remaining.min(TICK_MS);
            self.clock.advance(step);
            self.engine.tick();
            remaining -= step;
        }
        self.engine.current_playhead_ms()
    }

    /// Advance until the clock reads `clock_ms`
    pub fn advance_to(&mut self, clock_ms: u64) -> u64 {
        let now = self.clock.now_ms();
        assert!(clock_ms >= now, "clock cannot go backwards ({} < {})", clock_ms, now);
        self.advance(clock_ms - now)
    }

    /// Tick without moving the clock
    pub fn tick(&mut self) -> u64 {
        self.engine.tick()
    }

    pub fn id(&self, file: &str) -> TrackId {
        self.engine
            .track_by_file(file)
            .unwrap_or_else(|| panic!("no track for {}", file))
            .id
    }

    pub fn state(&self, file: &str) -> TrackState {
        self.engine.track(self.id(file)).map(|t| t.state).unwrap()
    }

    pub fn position(&self, file: &str) -> f64 {
        self.engine.track_position_sec(self.id(file)).unwrap()
    }

    /// Current-generation surface handle for a file
    pub fn surface(&self, file: &str) -> SimulatedHandle {
        self.factory
            .handle_by_id(self.id(file))
            .unwrap_or_else(|| panic!("no surface for {}", file))
    }
}

/// A track is active iff its window holds the playhead, the gate is clear,
/// and the timeline is playing
pub fn assert_window_invariant(engine: &SyncEngine) {
    let playhead = engine.current_playhead_ms();
    let may_play =
        !engine.is_globally_buffering() && engine.play_toggle().is_playing() && !engine.is_finished();

    for track in engine.tracks() {
        let expected = may_play && track.window_contains(playhead);
        assert_eq!(
            track.state == TrackState::Active,
            expected,
            "track {} ({:?}, start {}ms, duration {:?}) is {} at {}ms",
            track.id,
            track.source.file,
            track.start_offset_ms,
            track.duration_ms(),
            track.state,
            playhead
        );
    }
}

/// Collect every event currently queued for a subscriber
pub fn drain_events(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}
