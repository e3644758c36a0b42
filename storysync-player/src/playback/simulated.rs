//! In-memory playback surfaces driven by a [`Clock`]
//!
//! Used by the headless binary and by tests. Position advances at the
//! playback rate while playing and not starved; readiness, buffering and
//! metadata are injected through a [`SimulatedHandle`] that shares state with
//! the surface the engine owns.

use super::clock::Clock;
use super::surface::{
    PlaybackSurface, SurfaceError, SurfaceEvent, SurfaceEventSender, SurfaceFactory,
};
use super::track::Track;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use storysync_common::events::TrackId;
use tracing::debug;

#[derive(Debug)]
struct SimState {
    /// Position at the last anchor
    base_position_sec: f64,
    /// Clock time since which the position has been advancing
    anchor_ms: Option<u64>,
    rate: f64,
    paused: bool,
    ready: bool,
    starved: bool,
    duration_sec: Option<f64>,
    reject_next_play: bool,
    play_requests: u32,
    seeks: u32,
}

impl SimState {
    fn position_sec(&self, now_ms: u64) -> f64 {
        let advanced = match self.anchor_ms {
            Some(anchor) => now_ms.saturating_sub(anchor) as f64 / 1000.0 * self.rate,
            None => 0.0,
        };
        let position = self.base_position_sec + advanced;
        match self.duration_sec {
            Some(duration) if duration.is_finite() => position.min(duration),
            _ => position,
        }
    }

    /// Fold elapsed time into the base and re-anchor
    fn commit(&mut self, now_ms: u64) {
        self.base_position_sec = self.position_sec(now_ms);
        self.anchor_ms = if !self.paused && !self.starved {
            Some(now_ms)
        } else {
            None
        };
    }
}

#[derive(Clone)]
struct Shared {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SimState>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock leaves plain data behind; keep using it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Surface owned by the engine
pub struct SimulatedSurface {
    shared: Shared,
}

/// Test/driver side of a simulated surface
#[derive(Clone)]
pub struct SimulatedHandle {
    shared: Shared,
    events: SurfaceEventSender,
}

impl SimulatedSurface {
    /// Create a connected surface/handle pair
    pub fn new(
        clock: Arc<dyn Clock>,
        events: SurfaceEventSender,
        ready: bool,
        duration_sec: Option<f64>,
    ) -> (Self, SimulatedHandle) {
        let shared = Shared {
            clock,
            state: Arc::new(Mutex::new(SimState {
                base_position_sec: 0.0,
                anchor_ms: None,
                rate: 1.0,
                paused: true,
                ready,
                starved: false,
                duration_sec,
                reject_next_play: false,
                play_requests: 0,
                seeks: 0,
            })),
        };
        let handle = SimulatedHandle {
            shared: shared.clone(),
            events,
        };
        (Self { shared }, handle)
    }
}

impl PlaybackSurface for SimulatedSurface {
    fn local_position_sec(&self) -> f64 {
        let now = self.shared.clock.now_ms();
        self.shared.lock().position_sec(now)
    }

    fn set_local_position_sec(&mut self, position_sec: f64) -> Result<(), SurfaceError> {
        if !position_sec.is_finite() {
            return Err(SurfaceError::SeekFailed(format!("invalid position {}", position_sec)));
        }
        let now = self.shared.clock.now_ms();
        let mut state = self.shared.lock();
        state.base_position_sec = position_sec.max(0.0);
        state.seeks += 1;
        state.anchor_ms = if !state.paused && !state.starved {
            Some(now)
        } else {
            None
        };
        Ok(())
    }

    fn duration_sec(&self) -> Option<f64> {
        self.shared.lock().duration_sec
    }

    fn play(&mut self) -> Result<(), SurfaceError> {
        let now = self.shared.clock.now_ms();
        let mut state = self.shared.lock();
        state.play_requests += 1;
        if state.reject_next_play {
            state.reject_next_play = false;
            return Err(SurfaceError::PlayRejected("autoplay blocked".to_string()));
        }
        if !state.ready {
            return Err(SurfaceError::NotReady);
        }
        state.commit(now);
        state.paused = false;
        state.commit(now);
        Ok(())
    }

    fn pause(&mut self) {
        let now = self.shared.clock.now_ms();
        let mut state = self.shared.lock();
        state.commit(now);
        state.paused = true;
        state.commit(now);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let now = self.shared.clock.now_ms();
        let mut state = self.shared.lock();
        state.commit(now);
        state.rate = rate;
    }

    fn playback_rate(&self) -> f64 {
        self.shared.lock().rate
    }

    fn is_ready(&self) -> bool {
        self.shared.lock().ready
    }

    fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }
}

impl SimulatedHandle {
    pub fn track_id(&self) -> TrackId {
        self.events.track_id()
    }

    pub fn generation(&self) -> u64 {
        self.events.generation()
    }

    /// Deliver a raw surface event to the engine
    pub fn emit(&self, event: SurfaceEvent) {
        self.events.emit(event);
    }

    /// Mark the source playable and notify the engine
    pub fn make_ready(&self) {
        {
            let now = self.shared.clock.now_ms();
            let mut state = self.shared.lock();
            state.ready = true;
            state.starved = false;
            state.commit(now);
        }
        self.events.emit(SurfaceEvent::ReadyToPlay);
    }

    /// Deliver metadata with the source duration
    pub fn load_metadata(&self, duration_sec: f64) {
        self.shared.lock().duration_sec = Some(duration_sec);
        self.events.emit(SurfaceEvent::MetadataLoaded { duration_sec });
    }

    /// Source runs out of data: position freezes, engine is told
    pub fn starve(&self) {
        {
            let now = self.shared.clock.now_ms();
            let mut state = self.shared.lock();
            state.commit(now);
            state.starved = true;
            state.commit(now);
        }
        self.events.emit(SurfaceEvent::WaitingForData);
    }

    /// Data arrives again
    pub fn recover(&self) {
        {
            let now = self.shared.clock.now_ms();
            let mut state = self.shared.lock();
            state.commit(now);
            state.starved = false;
            state.ready = true;
            state.commit(now);
        }
        self.events.emit(SurfaceEvent::ResumedPlaying);
    }

    /// Make the next `play()` fail once
    pub fn reject_next_play(&self) {
        self.shared.lock().reject_next_play = true;
    }

    /// Shift the position without the engine's involvement
    pub fn nudge_position_sec(&self, delta_sec: f64) {
        let now = self.shared.clock.now_ms();
        let mut state = self.shared.lock();
        state.commit(now);
        state.base_position_sec = (state.base_position_sec + delta_sec).max(0.0);
    }

    pub fn position_sec(&self) -> f64 {
        let now = self.shared.clock.now_ms();
        self.shared.lock().position_sec(now)
    }

    pub fn playback_rate(&self) -> f64 {
        self.shared.lock().rate
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    pub fn play_requests(&self) -> u32 {
        self.shared.lock().play_requests
    }

    pub fn seeks(&self) -> u32 {
        self.shared.lock().seeks
    }
}

/// Factory producing simulated surfaces and keeping their handles
pub struct SimulatedSurfaceFactory {
    clock: Arc<dyn Clock>,
    ready_on_create: bool,
    default_media_duration_sec: Option<f64>,
    media_durations: HashMap<String, f64>,
    handles: Mutex<Vec<(Option<String>, SimulatedHandle)>>,
}

impl SimulatedSurfaceFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            ready_on_create: true,
            default_media_duration_sec: None,
            media_durations: HashMap::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Whether new surfaces start out playable
    pub fn ready_on_create(mut self, ready: bool) -> Self {
        self.ready_on_create = ready;
        self
    }

    /// Duration reported as metadata by every source without an override
    pub fn default_media_duration(mut self, duration_sec: f64) -> Self {
        self.default_media_duration_sec = Some(duration_sec);
        self
    }

    /// Duration reported as metadata for one source URL
    pub fn media_duration(mut self, url: impl Into<String>, duration_sec: f64) -> Self {
        self.media_durations.insert(url.into(), duration_sec);
        self
    }

    fn handles(&self) -> MutexGuard<'_, Vec<(Option<String>, SimulatedHandle)>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Most recently created handle for a source URL
    pub fn handle_for(&self, url: &str) -> Option<SimulatedHandle> {
        self.handles()
            .iter()
            .rev()
            .find(|(source, _)| source.as_deref() == Some(url))
            .map(|(_, handle)| handle.clone())
    }

    /// Handle for a track id
    pub fn handle_by_id(&self, track_id: TrackId) -> Option<SimulatedHandle> {
        self.handles()
            .iter()
            .rev()
            .find(|(_, handle)| handle.track_id() == track_id)
            .map(|(_, handle)| handle.clone())
    }

    /// Number of surfaces created so far
    pub fn created(&self) -> usize {
        self.handles().len()
    }
}

impl SurfaceFactory for SimulatedSurfaceFactory {
    fn create_surface(
        &self,
        track: &Track,
        source_url: Option<&str>,
        events: SurfaceEventSender,
    ) -> Box<dyn PlaybackSurface> {
        let duration_sec = source_url
            .and_then(|url| self.media_durations.get(url).copied())
            .or(self.default_media_duration_sec);

        let (surface, handle) =
            SimulatedSurface::new(Arc::clone(&self.clock), events, self.ready_on_create, None);

        debug!(
            "Simulated surface for {} ({}) ready={} duration={:?}",
            track.id,
            source_url.unwrap_or("<none>"),
            self.ready_on_create,
            duration_sec
        );

        // Metadata and readiness arrive asynchronously, as from a real player
        if let Some(duration) = duration_sec {
            handle.load_metadata(duration);
        }
        if self.ready_on_create {
            handle.emit(SurfaceEvent::ReadyToPlay);
        }

        self.handles()
            .push((source_url.map(str::to_string), handle));
        Box::new(surface)
    }
}
