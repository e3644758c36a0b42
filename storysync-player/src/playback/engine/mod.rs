//! Synchronized playback engine
//!
//! **Module Structure:**
//! - `core.rs`: Construction, population, replay, accessors
//! - `playback.rs`: Tick, play/pause toggle, scrub operations
//! - `diagnostics.rs`: Surface event handling, buffering gate effects, watchdog

mod core;
mod diagnostics;
mod playback;

pub use core::SyncEngine;
