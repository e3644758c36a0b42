//! Track-related type definitions
//!
//! Identity, kind and lifecycle state of a timed media unit on the shared
//! timeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a track (one per underlying playback surface)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TrackId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackKind {
    Video,
    Audio,
    BackgroundColor,
}

impl TrackKind {
    /// Whether the track is backed by buffered media (video/audio)
    pub fn is_media(&self) -> bool {
        matches!(self, TrackKind::Video | TrackKind::Audio)
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::BackgroundColor => write!(f, "background-color"),
        }
    }
}

/// Per-track playback lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    /// Playhead has not reached the track window (or was moved before it)
    Unstarted,
    /// Inside the window and playing
    Active,
    /// Inside the window, held by the gate or the play toggle
    Paused,
    /// Inside the window, its own source is waiting for data
    Buffering,
    /// Playhead passed the end of the window
    Ended,
}

impl TrackState {
    /// States in which the track has entered its window
    pub fn has_started(&self) -> bool {
        matches!(self, TrackState::Active | TrackState::Paused | TrackState::Buffering)
    }
}

impl std::fmt::Display for TrackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackState::Unstarted => write!(f, "unstarted"),
            TrackState::Active => write!(f, "active"),
            TrackState::Paused => write!(f, "paused"),
            TrackState::Buffering => write!(f, "buffering"),
            TrackState::Ended => write!(f, "ended"),
        }
    }
}

/// Timeline-level play/pause toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayToggle {
    Playing,
    Paused,
}

impl PlayToggle {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlayToggle::Playing)
    }
}

impl std::fmt::Display for PlayToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayToggle::Playing => write!(f, "playing"),
            PlayToggle::Paused => write!(f, "paused"),
        }
    }
}
