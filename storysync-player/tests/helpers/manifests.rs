//! Timelines used across scenario tests

/// Master A on [0, 10000), audio B on [4000, 7000)
///
/// A learns its duration from metadata; B's is authored.
pub const TWO_TRACKS: &str = r##"{
    "items": [
        { "type": "video", "start": "0:00", "file": "a.mp4" },
        { "type": "audio", "start": "0:04", "duration": 3000, "file": "b.mp3" }
    ],
    "chapters": [
        { "title": "Opening", "start": 0 },
        { "title": "Voice", "start": "0:04" }
    ]
}"##;

/// Long master with a long overlapping audio track, for drift tests
pub const LONG_OVERLAP: &str = r##"{
    "items": [
        { "type": "video", "start": 0, "file": "a.mp4" },
        { "type": "audio", "start": 1000, "duration": "0:15", "file": "c.mp3" }
    ]
}"##;

/// Per-viewport videos, a shared audio bed and two backgrounds
pub const RESPONSIVE: &str = r##"{
    "items": [
        { "type": "background", "start": 0, "color": "#111111" },
        { "type": "video", "start": 0, "file": "wide.mp4", "showOnMobile": false },
        { "type": "video", "start": 0, "file": "tall.mp4", "showOnMobile": true },
        { "type": "audio", "start": 0, "file": "bed.mp3" },
        { "type": "background", "start": "0:06", "color": "#222222" }
    ]
}"##;

/// Audio only; the playhead runs on the clock
pub const NO_VIDEO: &str = r##"{
    "items": [
        { "type": "audio", "start": 0, "file": "narration.mp3" }
    ]
}"##;
