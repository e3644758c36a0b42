//! Timeline manifest (authoring data)
//!
//! The manifest is an ordered list of item descriptors plus optional chapter
//! markers. It is loaded once and iterated to build tracks; the engine never
//! mutates it.
//!
//! ```json
//! {
//!   "items": [
//!     { "type": "background", "start": "0:00", "color": "#101820" },
//!     { "type": "video", "start": "0:00", "file": "intro.m3u8", "showOnMobile": false },
//!     { "type": "audio", "start": "0:04.000", "duration": 3000, "file": "voice.mp3" }
//!   ],
//!   "chapters": [ { "title": "Intro", "start": "0:00" } ]
//! }
//! ```

use crate::time::TimeValue;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default color shown when no background item is active
pub const DEFAULT_BACKGROUND_COLOR: &str = "#000000";

/// Viewport class used for per-device item selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportClass {
    Mobile,
    Desktop,
}

impl ViewportClass {
    /// Classify a viewport width against the mobile breakpoint (exclusive)
    pub fn from_width(width_px: u32, breakpoint_px: u32) -> Self {
        if width_px < breakpoint_px {
            ViewportClass::Mobile
        } else {
            ViewportClass::Desktop
        }
    }
}

impl std::fmt::Display for ViewportClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewportClass::Mobile => write!(f, "mobile"),
            ViewportClass::Desktop => write!(f, "desktop"),
        }
    }
}

/// Manifest item type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Video,
    Audio,
    Background,
}

/// Presentation fields carried opaquely for the visual layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_fit: Option<String>,
}

/// One timed item of the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,

    /// Absolute start on the shared timeline
    pub start: TimeValue,

    /// Authored duration; media items otherwise learn it from metadata
    #[serde(default)]
    pub duration: Option<TimeValue>,

    /// Default source reference
    #[serde(default)]
    pub file: Option<String>,

    /// Quality variants, resolved by the external source selector
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub high: Option<String>,

    /// `Some(true)`: mobile only, `Some(false)`: desktop only, `None`: both
    #[serde(default)]
    pub show_on_mobile: Option<bool>,

    /// Fill color for background items
    #[serde(default)]
    pub color: Option<String>,

    #[serde(flatten)]
    pub presentation: Presentation,
}

impl ManifestItem {
    /// Start offset in milliseconds
    pub fn start_ms(&self) -> Result<u64> {
        self.start.as_ms()
    }

    /// Authored duration in milliseconds, if present
    pub fn duration_ms(&self) -> Result<Option<u64>> {
        self.duration.as_ref().map(TimeValue::as_ms).transpose()
    }

    /// Whether this item is shown for the viewport
    ///
    /// Only video items are filtered per device; audio and background items
    /// are shared by every viewport.
    pub fn visible_on(&self, viewport: ViewportClass) -> bool {
        if self.item_type != ItemType::Video {
            return true;
        }
        match (self.show_on_mobile, viewport) {
            (None, _) => true,
            (Some(true), ViewportClass::Mobile) => true,
            (Some(false), ViewportClass::Desktop) => true,
            _ => false,
        }
    }
}

/// Chapter marker for the progress control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start: TimeValue,
}

/// Parsed timeline manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub items: Vec<ManifestItem>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl Manifest {
    /// Parse a manifest from JSON text and validate every timestamp
    pub fn from_json_str(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that every start/duration parses and backgrounds carry a color
    pub fn validate(&self) -> Result<()> {
        for (index, item) in self.items.iter().enumerate() {
            item.start_ms()?;
            item.duration_ms()?;
            if item.item_type == ItemType::Background && item.color.is_none() {
                return Err(Error::InvalidInput(format!(
                    "background item {} has no color",
                    index
                )));
            }
        }
        for chapter in &self.chapters {
            chapter.start.as_ms()?;
        }
        Ok(())
    }

    /// Items shown for the viewport, in manifest order
    pub fn items_for_viewport(&self, viewport: ViewportClass) -> Vec<&ManifestItem> {
        self.items
            .iter()
            .filter(|item| item.visible_on(viewport))
            .collect()
    }

    /// Latest chapter whose start is at or before `position_ms`
    pub fn chapter_at(&self, position_ms: u64) -> Option<&Chapter> {
        self.chapters
            .iter()
            .filter_map(|chapter| chapter.start.as_ms().ok().map(|start| (start, chapter)))
            .filter(|(start, _)| *start <= position_ms)
            .max_by_key(|(start, _)| *start)
            .map(|(_, chapter)| chapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "items": [
            { "type": "background", "start": "0:00", "color": "#101820" },
            { "type": "video", "start": "0:00", "file": "wide.m3u8", "showOnMobile": false, "z": 2, "objectFit": "cover" },
            { "type": "video", "start": "0:00", "file": "tall.m3u8", "showOnMobile": true },
            { "type": "video", "start": "0:04.000", "duration": "0:03", "file": "insert.mp4" },
            { "type": "audio", "start": 2000, "file": "voice.mp3", "low": "voice-64.mp3" },
            { "type": "background", "start": "0:06", "color": "#f0e0d0" }
        ],
        "chapters": [
            { "title": "Arrival", "start": "0:00" },
            { "title": "Departure", "start": "0:05.500" }
        ]
    }"##;

    #[test]
    fn test_parse_sample_manifest() {
        let manifest = Manifest::from_json_str(SAMPLE).unwrap();
        assert_eq!(manifest.items.len(), 6);
        assert_eq!(manifest.items[3].start_ms().unwrap(), 4_000);
        assert_eq!(manifest.items[3].duration_ms().unwrap(), Some(3_000));
        assert_eq!(manifest.items[4].start_ms().unwrap(), 2_000);
        assert_eq!(manifest.items[1].presentation.z, Some(2));
        assert_eq!(manifest.items[1].presentation.object_fit.as_deref(), Some("cover"));
    }

    #[test]
    fn test_viewport_filtering() {
        let manifest = Manifest::from_json_str(SAMPLE).unwrap();

        let desktop = manifest.items_for_viewport(ViewportClass::Desktop);
        let files: Vec<_> = desktop.iter().filter_map(|i| i.file.as_deref()).collect();
        assert_eq!(files, vec!["wide.m3u8", "insert.mp4", "voice.mp3"]);

        let mobile = manifest.items_for_viewport(ViewportClass::Mobile);
        let files: Vec<_> = mobile.iter().filter_map(|i| i.file.as_deref()).collect();
        assert_eq!(files, vec!["tall.m3u8", "insert.mp4", "voice.mp3"]);

        // Backgrounds survive on both
        assert_eq!(desktop.len(), 5);
        assert_eq!(mobile.len(), 5);
    }

    #[test]
    fn test_viewport_class_from_width() {
        assert_eq!(ViewportClass::from_width(599, 600), ViewportClass::Mobile);
        assert_eq!(ViewportClass::from_width(600, 600), ViewportClass::Desktop);
    }

    #[test]
    fn test_chapter_at() {
        let manifest = Manifest::from_json_str(SAMPLE).unwrap();
        assert_eq!(manifest.chapter_at(0).unwrap().title, "Arrival");
        assert_eq!(manifest.chapter_at(5_499).unwrap().title, "Arrival");
        assert_eq!(manifest.chapter_at(5_500).unwrap().title, "Departure");
    }

    #[test]
    fn test_invalid_start_is_rejected() {
        let json = r#"{ "items": [ { "type": "audio", "start": "soon" } ] }"#;
        assert!(matches!(Manifest::from_json_str(json), Err(Error::InvalidTime(_))));
    }

    #[test]
    fn test_background_without_color_is_rejected() {
        let json = r#"{ "items": [ { "type": "background", "start": 0 } ] }"#;
        assert!(matches!(Manifest::from_json_str(json), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_type_is_manifest_error() {
        let json = r#"{ "items": [ { "type": "hologram", "start": 0 } ] }"#;
        assert!(matches!(Manifest::from_json_str(json), Err(Error::Manifest(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlist.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.chapters.len(), 2);
    }
}
