//! Shared published state
//!
//! The engine is the single writer; UI readers (progress control, overlays,
//! loading indicator) read lock-free from any thread. Each value is one atomic
//! store, so readers never observe a half-written update.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use storysync_common::events::{EventBus, SyncEvent};
use tokio::sync::broadcast;

/// Engine outputs readable from outside the engine task
pub struct SharedSyncState {
    playhead_ms: AtomicU64,
    total_duration_ms: AtomicU64,
    buffering: AtomicBool,
    playing: AtomicBool,
    outro_window: AtomicBool,
    generation: AtomicU64,

    /// Event broadcaster for UI listeners
    event_bus: EventBus,
}

impl SharedSyncState {
    pub fn new(bus_capacity: usize) -> Self {
        Self {
            playhead_ms: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            buffering: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            outro_window: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            event_bus: EventBus::new(bus_capacity),
        }
    }

    /// Broadcast an event to all listeners (no receivers is OK)
    pub fn broadcast_event(&self, event: SyncEvent) {
        self.event_bus.emit_lossy(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_bus.subscribe()
    }

    pub fn current_playhead_ms(&self) -> u64 {
        self.playhead_ms.load(Ordering::Acquire)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms.load(Ordering::Acquire)
    }

    pub fn is_globally_buffering(&self) -> bool {
        self.buffering.load(Ordering::Acquire)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn in_outro_window(&self) -> bool {
        self.outro_window.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn set_playhead_ms(&self, value: u64) {
        self.playhead_ms.store(value, Ordering::Release);
    }

    pub(crate) fn set_total_duration_ms(&self, value: u64) {
        self.total_duration_ms.store(value, Ordering::Release);
    }

    pub(crate) fn set_buffering(&self, value: bool) {
        self.buffering.store(value, Ordering::Release);
    }

    pub(crate) fn set_playing(&self, value: bool) {
        self.playing.store(value, Ordering::Release);
    }

    pub(crate) fn set_outro_window(&self, value: bool) {
        self.outro_window.store(value, Ordering::Release);
    }

    pub(crate) fn set_generation(&self, value: u64) {
        self.generation.store(value, Ordering::Release);
    }
}

impl Default for SharedSyncState {
    fn default() -> Self {
        Self::new(256)
    }
}
