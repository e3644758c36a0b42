//! # storysync player library
//!
//! Multi-track synchronized playback engine.
//!
//! **Purpose:** Keep overlapping video/audio tracks aligned to one shared
//! playhead, gate playback behind a buffering consensus, and re-synchronize
//! every track on scrub and replay.
//!
//! **Architecture:** One master track drives the playhead; a tick loop
//! evaluates each track's window, nudges playback rates to cancel drift and
//! publishes the playhead. Surfaces report readiness and stalls over a
//! channel.

pub mod config;
pub mod error;
pub mod playback;
pub mod state;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use playback::SyncEngine;
pub use state::SharedSyncState;
