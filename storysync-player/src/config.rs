//! Configuration for the synchronized playback engine
//!
//! Loaded from a TOML file whose location is resolved by
//! `storysync_common::config::resolve_config_path`. Every field has a
//! built-in default, so a missing file (or a missing section) degrades to
//! defaults with a warning instead of failing startup.
//!
//! ```toml
//! [drift]
//! tolerance_sec = 0.03
//! gain = 0.5
//! min_rate = 0.5
//! max_rate = 2.0
//!
//! [timeline]
//! outro_offset_ms = 2000
//! tick_interval_ms = 16
//! mobile_breakpoint_px = 600
//! gate_initial_load = true
//! stall_warning_ms = 10000
//!
//! [events]
//! bus_capacity = 256
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub drift: DriftConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Proportional drift-correction parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriftConfig {
    /// Drift (seconds) below which playback rate is forced to 1.0
    #[serde(default = "default_tolerance_sec")]
    pub tolerance_sec: f64,

    /// Rate change per second of drift
    #[serde(default = "default_gain")]
    pub gain: f64,

    #[serde(default = "default_min_rate")]
    pub min_rate: f64,

    #[serde(default = "default_max_rate")]
    pub max_rate: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            tolerance_sec: default_tolerance_sec(),
            gain: default_gain(),
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
        }
    }
}

/// Timeline scheduling and phase parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimelineConfig {
    /// Outro overlay appears this many milliseconds before the end
    #[serde(default = "default_outro_offset_ms")]
    pub outro_offset_ms: u64,

    /// Scheduler tick period (one display refresh)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Viewports narrower than this are mobile
    #[serde(default = "default_mobile_breakpoint_px")]
    pub mobile_breakpoint_px: u32,

    /// Hold the buffering gate for media that is not ready when registered
    #[serde(default = "default_gate_initial_load")]
    pub gate_initial_load: bool,

    /// Warn when the gate stays set this long (0 disables)
    #[serde(default = "default_stall_warning_ms")]
    pub stall_warning_ms: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            outro_offset_ms: default_outro_offset_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            mobile_breakpoint_px: default_mobile_breakpoint_px(),
            gate_initial_load: default_gate_initial_load(),
            stall_warning_ms: default_stall_warning_ms(),
        }
    }
}

/// Event bus sizing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            bus_capacity: default_bus_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_tolerance_sec() -> f64 {
    0.03
}

fn default_gain() -> f64 {
    0.5
}

fn default_min_rate() -> f64 {
    0.5
}

fn default_max_rate() -> f64 {
    2.0
}

fn default_outro_offset_ms() -> u64 {
    2000
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_mobile_breakpoint_px() -> u32 {
    600
}

fn default_gate_initial_load() -> bool {
    true
}

fn default_stall_warning_ms() -> u64 {
    10_000
}

fn default_bus_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SyncConfig {
    /// Load configuration, falling back to defaults when no file exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: SyncConfig = storysync_common::config::load_toml_or_default(path)?;
        config.validate()?;
        if let Some(path) = path {
            info!("Configuration loaded from {}", path.display());
        }
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SyncConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the engine cannot honor
    pub fn validate(&self) -> Result<()> {
        let drift = &self.drift;
        if !(drift.min_rate > 0.0 && drift.min_rate <= 1.0) {
            return Err(Error::Config(format!(
                "drift.min_rate must be in (0, 1], got {}",
                drift.min_rate
            )));
        }
        if !(drift.max_rate >= 1.0 && drift.max_rate.is_finite()) {
            return Err(Error::Config(format!(
                "drift.max_rate must be finite and >= 1, got {}",
                drift.max_rate
            )));
        }
        if !(drift.tolerance_sec >= 0.0 && drift.tolerance_sec.is_finite()) {
            return Err(Error::Config(format!(
                "drift.tolerance_sec must be >= 0, got {}",
                drift.tolerance_sec
            )));
        }
        if !(drift.gain > 0.0 && drift.gain.is_finite()) {
            return Err(Error::Config(format!("drift.gain must be > 0, got {}", drift.gain)));
        }
        if self.timeline.tick_interval_ms == 0 {
            return Err(Error::Config("timeline.tick_interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}
