//! Event types for the storysync event system
//!
//! Provides the engine → UI event definitions and the EventBus used to
//! publish them.

mod track_types;

pub use track_types::{PlayToggle, TrackId, TrackKind, TrackState};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Engine events published to the surrounding UI / phase layer
///
/// Events are broadcast via EventBus and can be serialized for any external
/// transport. Every variant carries the wall-clock time it was emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Playhead republished after a tick or a scrub
    PlayheadUpdated {
        /// Current playhead (milliseconds on the shared timeline)
        playhead_ms: u64,
        /// Total program duration known so far (milliseconds)
        total_duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Total duration grew after a track's metadata arrived
    TotalDurationChanged {
        old_duration_ms: u64,
        new_duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Global buffering flag flipped
    ///
    /// Triggers:
    /// - UI: show/hide the loading indicator
    BufferingChanged {
        is_buffering: bool,
        /// Number of tracks currently holding the gate
        stalled_tracks: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track moved between lifecycle states
    TrackStateChanged {
        track_id: TrackId,
        old_state: TrackState,
        new_state: TrackState,
        playhead_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Timeline-level play/pause toggle changed
    PlaybackToggled {
        old_state: PlayToggle,
        new_state: PlayToggle,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playhead entered the outro window (edge-triggered)
    OutroWindowEntered {
        playhead_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playhead left the outro window (e.g. user scrubbed back)
    OutroWindowExited {
        playhead_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playhead reached the end of the program
    ProgramFinished {
        total_duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Full replay reset the timeline
    Replayed {
        /// Registry generation created by the replay
        generation: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Gate held longer than the configured stall warning threshold
    ///
    /// Detection-only: playback state is not changed.
    StallWatchdog {
        stalled_for_ms: u64,
        stalled_tracks: Vec<TrackId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SyncEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &str {
        match self {
            SyncEvent::PlayheadUpdated { .. } => "PlayheadUpdated",
            SyncEvent::TotalDurationChanged { .. } => "TotalDurationChanged",
            SyncEvent::BufferingChanged { .. } => "BufferingChanged",
            SyncEvent::TrackStateChanged { .. } => "TrackStateChanged",
            SyncEvent::PlaybackToggled { .. } => "PlaybackToggled",
            SyncEvent::OutroWindowEntered { .. } => "OutroWindowEntered",
            SyncEvent::OutroWindowExited { .. } => "OutroWindowExited",
            SyncEvent::ProgramFinished { .. } => "ProgramFinished",
            SyncEvent::Replayed { .. } => "Replayed",
            SyncEvent::StallWatchdog { .. } => "StallWatchdog",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the engine tick)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use storysync_common::events::{EventBus, PlayToggle, SyncEvent};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SyncEvent::PlaybackToggled {
///     old_state: PlayToggle::Paused,
///     new_state: PlayToggle::Playing,
///     timestamp: chrono::Utc::now(),
/// });
///
/// let received = rx.try_recv().unwrap();
/// assert_eq!(received.event_type(), "PlaybackToggled");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SyncEvent,
    ) -> Result<usize, broadcast::error::SendError<SyncEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
