//! Engine configuration discovery and its effect on a running engine
//!
//! Tests touching STORYSYNC_CONFIG are #[serial].

mod helpers;

use helpers::manifests::TWO_TRACKS;
use helpers::TestRig;
use serial_test::serial;
use std::env;
use storysync_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use storysync_common::ViewportClass;
use storysync_player::SyncConfig;

#[test]
#[serial]
fn test_config_file_from_env_var() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storysync.toml");
    std::fs::write(&path, "[timeline]\noutro_offset_ms = 4000\n\n[drift]\ngain = 0.25\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    env::remove_var(CONFIG_ENV_VAR);

    let config = SyncConfig::load(resolved.as_deref()).unwrap();
    assert_eq!(config.timeline.outro_offset_ms, 4_000);
    assert_eq!(config.drift.gain, 0.25);
    // Untouched sections keep their defaults
    assert_eq!(config.drift.max_rate, 2.0);
    assert_eq!(config.timeline.tick_interval_ms, 16);
}

#[test]
#[serial]
fn test_missing_env_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    env::set_var(CONFIG_ENV_VAR, dir.path().join("absent.toml"));
    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    env::remove_var(CONFIG_ENV_VAR);

    let config = SyncConfig::load(resolved.as_deref()).unwrap();
    assert_eq!(config, SyncConfig::default());
}

#[test]
fn test_invalid_drift_bounds_are_rejected() {
    let result = SyncConfig::from_toml_str("[drift]\nmin_rate = 1.5\nmax_rate = 1.2\n");
    assert!(result.is_err());
}

#[test]
fn test_outro_offset_from_config_moves_latch() {
    let config = SyncConfig::from_toml_str("[timeline]\noutro_offset_ms = 5000\n").unwrap();
    let mut rig = TestRig::build(TWO_TRACKS, ViewportClass::Desktop, config, true);
    rig.engine.pump_events();
    rig.engine.start();

    rig.engine.scrub(4_900);
    assert!(!rig.engine.overlay().outro_overlay);
    rig.engine.scrub(5_000);
    assert!(rig.engine.overlay().outro_overlay);
}
