//! Media registry and master clock
//!
//! Ordered bookkeeping of every track in the current generation together
//! with the surface that plays it. The registry designates the master track
//! whose own position is the authoritative playhead, and maintains the
//! monotonic total duration.

use super::surface::PlaybackSurface;
use super::track::Track;
use storysync_common::events::TrackId;
use tracing::{debug, warn};

/// A registered track and its surface
pub struct TrackEntry {
    pub track: Track,
    pub surface: Box<dyn PlaybackSurface>,
}

impl std::fmt::Debug for TrackEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackEntry")
            .field("track", &self.track)
            .field("position_sec", &self.surface.local_position_sec())
            .finish()
    }
}

/// Registry of tracks for one generation
#[derive(Debug, Default)]
pub struct MediaRegistry {
    entries: Vec<TrackEntry>,
    master: Option<TrackId>,
    total_duration_ms: u64,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track; idempotent per track id
    ///
    /// A master registration demotes any previous master. Asking for two
    /// masters is a caller mistake: the later request wins and the demotion
    /// is logged.
    ///
    /// Returns true if the track was newly added.
    pub fn register(&mut self, mut track: Track, surface: Box<dyn PlaybackSurface>, is_master: bool) -> bool {
        let id = track.id;
        let exists = self.entries.iter().any(|e| e.track.id == id);

        if !exists {
            track.is_master = false;
            self.entries.push(TrackEntry { track, surface });
        } else {
            debug!("Track {} already registered", id);
        }

        if is_master {
            self.set_master(id);
        }

        !exists
    }

    fn set_master(&mut self, id: TrackId) {
        if let Some(previous) = self.master {
            if previous != id {
                warn!("Demoting master {} in favor of {}", previous, id);
            }
        }
        for entry in &mut self.entries {
            entry.track.is_master = entry.track.id == id;
        }
        self.master = Some(id);
    }

    pub fn master_id(&self) -> Option<TrackId> {
        self.master
    }

    pub fn master(&self) -> Option<&TrackEntry> {
        self.master.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: TrackId) -> Option<&TrackEntry> {
        self.entries.iter().find(|e| e.track.id == id)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut TrackEntry> {
        self.entries.iter_mut().find(|e| e.track.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Playhead reported by the master, if it has started
    pub fn master_playhead_ms(&self) -> Option<u64> {
        let master = self.master()?;
        if !master.track.state.has_started() {
            return None;
        }
        let position_sec = master.surface.local_position_sec();
        if !position_sec.is_finite() {
            return None;
        }
        let local_ms = (position_sec.max(0.0) * 1000.0).round() as u64;
        Some(master.track.start_offset_ms + local_ms)
    }

    /// Master playhead, or `fallback_ms` when no master is running
    pub fn playhead_ms(&self, fallback_ms: u64) -> u64 {
        self.master_playhead_ms().unwrap_or(fallback_ms)
    }

    /// Record a duration reported by a track's surface
    ///
    /// Non-finite and non-positive readings are ignored. Returns true if the
    /// track learned its duration from this call.
    pub fn apply_metadata(&mut self, id: TrackId, duration_sec: f64) -> bool {
        let Some(duration_ms) = sanitize_duration(duration_sec) else {
            debug!("Ignoring unusable duration {} for {}", duration_sec, id);
            return false;
        };
        match self.get_mut(id) {
            Some(entry) => entry.track.set_duration_ms(duration_ms),
            None => false,
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Carry a known total into a fresh generation
    pub fn seed_total_duration(&mut self, total_ms: u64) {
        self.total_duration_ms = self.total_duration_ms.max(total_ms);
    }

    /// Rescan durations and grow the total if needed
    ///
    /// Tracks without a duration are polled from their surfaces first. The
    /// total never decreases. Returns `(old, new)` when it grew.
    pub fn recompute_total_duration(&mut self) -> Option<(u64, u64)> {
        for entry in &mut self.entries {
            if entry.track.duration_ms().is_none() && entry.track.kind.is_media() {
                if let Some(duration_ms) = entry.surface.duration_sec().and_then(sanitize_duration) {
                    entry.track.set_duration_ms(duration_ms);
                }
            }
        }

        let computed = self
            .entries
            .iter()
            .filter_map(|e| e.track.end_ms())
            .max()
            .unwrap_or(0);

        if computed > self.total_duration_ms {
            let old = self.total_duration_ms;
            self.total_duration_ms = computed;
            Some((old, computed))
        } else {
            None
        }
    }

    /// Pause every surface and drop all entries
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.surface.pause();
        }
        self.entries.clear();
        self.master = None;
    }
}

fn sanitize_duration(duration_sec: f64) -> Option<u64> {
    if duration_sec.is_finite() && duration_sec > 0.0 {
        Some((duration_sec * 1000.0).round() as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::source::SourceDescriptor;
    use crate::playback::surface::ColorSurface;
    use storysync_common::events::{TrackKind, TrackState};

    fn video(start_ms: u64) -> Track {
        Track::new(TrackKind::Video, start_ms, SourceDescriptor::default())
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = MediaRegistry::new();
        let track = video(0);
        let copy = track.clone();
        assert!(registry.register(track, Box::new(ColorSurface::new()), false));
        assert!(!registry.register(copy, Box::new(ColorSurface::new()), false));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_second_master_demotes_first() {
        let mut registry = MediaRegistry::new();
        let a = video(0);
        let b = video(0);
        let (a_id, b_id) = (a.id, b.id);

        registry.register(a, Box::new(ColorSurface::new()), true);
        registry.register(b, Box::new(ColorSurface::new()), true);

        assert_eq!(registry.master_id(), Some(b_id));
        assert!(!registry.get(a_id).unwrap().track.is_master);
        assert!(registry.get(b_id).unwrap().track.is_master);
        assert_eq!(registry.iter().filter(|e| e.track.is_master).count(), 1);
    }

    #[test]
    fn test_at_most_one_master_over_any_sequence() {
        let mut registry = MediaRegistry::new();
        let tracks: Vec<Track> = (0..6).map(|i| video(i * 100)).collect();
        for (i, track) in tracks.iter().enumerate() {
            registry.register(track.clone(), Box::new(ColorSurface::new()), i % 2 == 0);
            assert!(registry.iter().filter(|e| e.track.is_master).count() <= 1);
        }
        // Re-registering an existing track as master moves the flag
        registry.register(tracks[1].clone(), Box::new(ColorSurface::new()), true);
        assert_eq!(registry.master_id(), Some(tracks[1].id));
        assert_eq!(registry.iter().filter(|e| e.track.is_master).count(), 1);
    }

    #[test]
    fn test_playhead_falls_back_until_master_started() {
        let mut registry = MediaRegistry::new();
        let master = video(1000);
        let id = master.id;
        let mut surface = ColorSurface::new();
        surface.set_local_position_sec(2.5).unwrap();
        registry.register(master, Box::new(surface), true);

        assert_eq!(registry.playhead_ms(777), 777);

        registry.get_mut(id).unwrap().track.state = TrackState::Active;
        assert_eq!(registry.playhead_ms(777), 3500);
    }

    #[test]
    fn test_total_duration_is_monotonic() {
        let mut registry = MediaRegistry::new();
        let a = video(0);
        let b = video(4000);
        let (a_id, b_id) = (a.id, b.id);
        registry.register(a, Box::new(ColorSurface::new()), true);
        registry.register(b, Box::new(ColorSurface::new()), false);

        assert!(registry.apply_metadata(b_id, 3.0));
        assert_eq!(registry.recompute_total_duration(), Some((0, 7000)));

        assert!(!registry.apply_metadata(a_id, f64::NAN));
        assert_eq!(registry.recompute_total_duration(), None);
        assert_eq!(registry.total_duration_ms(), 7000);

        assert!(registry.apply_metadata(a_id, 10.0));
        assert_eq!(registry.recompute_total_duration(), Some((7000, 10000)));

        // A later, shorter reading cannot shrink anything
        assert!(!registry.apply_metadata(a_id, 2.0));
        assert_eq!(registry.recompute_total_duration(), None);
        assert_eq!(registry.total_duration_ms(), 10000);
    }

    #[test]
    fn test_seeded_total_survives_empty_registry() {
        let mut registry = MediaRegistry::new();
        registry.seed_total_duration(9000);
        assert_eq!(registry.recompute_total_duration(), None);
        assert_eq!(registry.total_duration_ms(), 9000);
    }

    #[test]
    fn test_clear_drops_master() {
        let mut registry = MediaRegistry::new();
        registry.register(video(0), Box::new(ColorSurface::new()), true);
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.master_id(), None);
    }
}
