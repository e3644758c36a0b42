//! Track data model and manifest-to-track planning
//!
//! A track is one timed unit on the shared timeline: it covers the window
//! `[start_offset_ms, start_offset_ms + duration_ms)`. Duration may be
//! unknown until the source reports metadata; an unknown duration means the
//! window is open-ended.

use super::source::SourceDescriptor;
use crate::error::Result;
use storysync_common::events::{TrackId, TrackKind, TrackState};
use storysync_common::manifest::{ItemType, Manifest};
use storysync_common::ViewportClass;

/// One timed media unit
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,

    /// Absolute start on the shared timeline (fixed at creation)
    pub start_offset_ms: u64,

    /// Discovered (or authored) duration; immutable once set
    duration_ms: Option<u64>,

    /// Managed by the registry; at most one master per registry
    pub is_master: bool,

    pub state: TrackState,
    pub source: SourceDescriptor,

    /// Fill color for background tracks
    pub color: Option<String>,
}

impl Track {
    pub fn new(kind: TrackKind, start_offset_ms: u64, source: SourceDescriptor) -> Self {
        Self {
            id: TrackId::new(),
            kind,
            start_offset_ms,
            duration_ms: None,
            is_master: false,
            state: TrackState::Unstarted,
            source,
            color: None,
        }
    }

    /// Background-color track
    pub fn background(start_offset_ms: u64, color: impl Into<String>) -> Self {
        let mut track = Self::new(
            TrackKind::BackgroundColor,
            start_offset_ms,
            SourceDescriptor::default(),
        );
        track.color = Some(color.into());
        track
    }

    /// Builder form of [`Track::set_duration_ms`]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.set_duration_ms(duration_ms);
        self
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    /// Record the duration; the first value wins
    ///
    /// Returns true if the duration was newly set.
    pub fn set_duration_ms(&mut self, duration_ms: u64) -> bool {
        if self.duration_ms.is_some() {
            return false;
        }
        self.duration_ms = Some(duration_ms);
        true
    }

    /// End of the window, if the duration is known
    pub fn end_ms(&self) -> Option<u64> {
        self.duration_ms.map(|d| self.start_offset_ms + d)
    }

    /// Playhead lies inside `[start, end)`
    pub fn window_contains(&self, playhead_ms: u64) -> bool {
        playhead_ms >= self.start_offset_ms && !self.window_elapsed(playhead_ms)
    }

    /// Playhead is at or past the end of a known window
    pub fn window_elapsed(&self, playhead_ms: u64) -> bool {
        self.end_ms().is_some_and(|end| playhead_ms >= end)
    }

    /// Local position the track should have at `playhead_ms`
    pub fn expected_local_sec(&self, playhead_ms: u64) -> f64 {
        playhead_ms.saturating_sub(self.start_offset_ms) as f64 / 1000.0
    }
}

/// A track to register, with its master designation
#[derive(Debug, Clone)]
pub struct TrackPlan {
    pub track: Track,
    pub is_master: bool,
}

/// Build tracks for one viewport from the manifest
///
/// Items are taken in manifest order after viewport filtering. The first
/// video becomes the master. Each background ends where the next background
/// (by start time) begins; the last one is open-ended.
pub fn plan_tracks(manifest: &Manifest, viewport: ViewportClass) -> Result<Vec<TrackPlan>> {
    let items = manifest.items_for_viewport(viewport);

    let mut background_starts = Vec::new();
    for item in &items {
        if item.item_type == ItemType::Background {
            background_starts.push(item.start_ms()?);
        }
    }
    background_starts.sort_unstable();

    let mut plans = Vec::with_capacity(items.len());
    let mut master_assigned = false;

    for item in items {
        let start_ms = item.start_ms()?;
        let authored_duration = item.duration_ms()?;

        let mut track = match item.item_type {
            ItemType::Video => Track::new(TrackKind::Video, start_ms, SourceDescriptor::from_item(item)),
            ItemType::Audio => Track::new(TrackKind::Audio, start_ms, SourceDescriptor::from_item(item)),
            ItemType::Background => {
                let color = item.color.clone().unwrap_or_default();
                let mut track = Track::background(start_ms, color);
                if let Some(next_start) = background_starts.iter().find(|s| **s > start_ms) {
                    track.set_duration_ms(next_start - start_ms);
                }
                track
            }
        };

        if let Some(duration) = authored_duration {
            track.set_duration_ms(duration);
        }

        let is_master = item.item_type == ItemType::Video && !master_assigned;
        master_assigned |= is_master;

        plans.push(TrackPlan { track, is_master });
    }

    Ok(plans)
}
