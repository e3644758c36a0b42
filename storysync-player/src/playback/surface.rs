//! Playback surface abstraction
//!
//! A surface is the underlying player for one track (a video element, an
//! audio sink, a color layer). The engine drives it synchronously through
//! [`PlaybackSurface`]; the surface reports back asynchronously by sending
//! [`SurfaceEvent`]s over the engine's channel. Delivery order relative to
//! the tick is unspecified.

use super::track::Track;
use storysync_common::events::TrackId;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// Failure of a surface request
///
/// Never fatal: callers log and let the window controller retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Surface not ready")]
    NotReady,

    #[error("Play rejected: {0}")]
    PlayRejected(String),

    #[error("Seek failed: {0}")]
    SeekFailed(String),
}

/// Operations the engine needs from an underlying player
pub trait PlaybackSurface: Send {
    /// Local position in seconds
    fn local_position_sec(&self) -> f64;

    fn set_local_position_sec(&mut self, position_sec: f64) -> Result<(), SurfaceError>;

    /// Source duration; `None` (or a non-finite value) until metadata loads
    fn duration_sec(&self) -> Option<f64>;

    fn play(&mut self) -> Result<(), SurfaceError>;

    fn pause(&mut self);

    fn set_playback_rate(&mut self, rate: f64);

    fn playback_rate(&self) -> f64;

    /// Enough data buffered to start playing
    fn is_ready(&self) -> bool;

    fn is_paused(&self) -> bool;
}

/// Asynchronous notifications from a surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    ReadyToPlay,
    WaitingForData,
    Stalled,
    ResumedPlaying,
    Ended,
    MetadataLoaded { duration_sec: f64 },
}

impl SurfaceEvent {
    /// Buffering edge implied by the event, if any
    pub fn buffering_signal(&self) -> Option<bool> {
        match self {
            SurfaceEvent::WaitingForData | SurfaceEvent::Stalled => Some(true),
            SurfaceEvent::ReadyToPlay | SurfaceEvent::ResumedPlaying | SurfaceEvent::Ended => {
                Some(false)
            }
            SurfaceEvent::MetadataLoaded { .. } => None,
        }
    }
}

/// Event tagged with its origin and registry generation
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEnvelope {
    pub track_id: TrackId,
    pub generation: u64,
    pub event: SurfaceEvent,
}

/// Sending half handed to each surface at creation
///
/// Stamps every event with the track and the generation the surface was
/// created in, so the engine can drop callbacks from a replaced registry.
#[derive(Debug, Clone)]
pub struct SurfaceEventSender {
    track_id: TrackId,
    generation: u64,
    tx: mpsc::UnboundedSender<SurfaceEnvelope>,
}

impl SurfaceEventSender {
    pub fn new(
        track_id: TrackId,
        generation: u64,
        tx: mpsc::UnboundedSender<SurfaceEnvelope>,
    ) -> Self {
        Self {
            track_id,
            generation,
            tx,
        }
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Send an event; a closed engine channel is ignored
    pub fn emit(&self, event: SurfaceEvent) {
        let envelope = SurfaceEnvelope {
            track_id: self.track_id,
            generation: self.generation,
            event,
        };
        if self.tx.send(envelope).is_err() {
            trace!("Surface event for {} dropped: engine channel closed", self.track_id);
        }
    }
}

/// Creates the underlying surface for a media track
pub trait SurfaceFactory: Send + Sync {
    fn create_surface(
        &self,
        track: &Track,
        source_url: Option<&str>,
        events: SurfaceEventSender,
    ) -> Box<dyn PlaybackSurface>;
}

/// Surface for background-color tracks
///
/// Has no media behind it: always ready, never buffers, position only moves
/// when seeked.
#[derive(Debug, Clone)]
pub struct ColorSurface {
    position_sec: f64,
    paused: bool,
    rate: f64,
}

impl ColorSurface {
    pub fn new() -> Self {
        Self {
            position_sec: 0.0,
            paused: true,
            rate: 1.0,
        }
    }
}

impl Default for ColorSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSurface for ColorSurface {
    fn local_position_sec(&self) -> f64 {
        self.position_sec
    }

    fn set_local_position_sec(&mut self, position_sec: f64) -> Result<(), SurfaceError> {
        self.position_sec = position_sec.max(0.0);
        Ok(())
    }

    fn duration_sec(&self) -> Option<f64> {
        None
    }

    fn play(&mut self) -> Result<(), SurfaceError> {
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
