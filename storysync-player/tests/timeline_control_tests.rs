//! Scrub, replay, drift correction and stall watchdog tests

mod helpers;

use helpers::manifests::{LONG_OVERLAP, TWO_TRACKS};
use helpers::{assert_window_invariant, drain_events, TestRig};
use storysync_common::events::{PlayToggle, SyncEvent, TrackState};
use storysync_common::ViewportClass;
use storysync_player::playback::Clock;
use storysync_player::SyncConfig;

const TOLERANCE_SEC: f64 = 0.03;

// ----- scrub -----

#[test]
fn test_scrub_parks_tracks_then_resumes_on_tick() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(1_000);

    assert_eq!(rig.engine.scrub(5_000), 5_000);
    assert_eq!(rig.state("a.mp4"), TrackState::Paused);
    assert_eq!(rig.state("b.mp3"), TrackState::Paused);
    assert!((rig.position("a.mp4") - 5.0).abs() < 1e-6);
    assert!((rig.position("b.mp3") - 1.0).abs() < 1e-6);

    rig.tick();
    assert_eq!(rig.state("a.mp4"), TrackState::Active);
    assert_eq!(rig.state("b.mp3"), TrackState::Active);
    assert_window_invariant(&rig.engine);

    let playhead = rig.advance(1_000);
    assert!((5_980..=6_020).contains(&playhead));
}

#[test]
fn test_scrub_is_idempotent() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(2_000);

    rig.engine.scrub(4_500);
    let first: Vec<(TrackState, f64)> = ["a.mp4", "b.mp3"]
        .iter()
        .map(|file| (rig.state(file), rig.position(file)))
        .collect();

    rig.engine.scrub(4_500);
    let second: Vec<(TrackState, f64)> = ["a.mp4", "b.mp3"]
        .iter()
        .map(|file| (rig.state(file), rig.position(file)))
        .collect();

    assert_eq!(first, second);
    assert_eq!(rig.engine.current_playhead_ms(), 4_500);
}

#[test]
fn test_scrub_backwards_rewinds_tracks_not_yet_started() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(5_500);
    assert_eq!(rig.state("b.mp3"), TrackState::Active);

    rig.engine.scrub(1_000);
    assert_eq!(rig.state("b.mp3"), TrackState::Unstarted);
    assert_eq!(rig.position("b.mp3"), 0.0);
    assert!(rig.surface("b.mp3").is_paused());

    let playhead = rig.advance(3_500);
    assert!((4_450..=4_520).contains(&playhead));
    assert_eq!(rig.state("b.mp3"), TrackState::Active);

    rig.advance(3_000);
    assert_eq!(rig.state("b.mp3"), TrackState::Ended);
}

#[test]
fn test_scrub_clamps_to_total() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(500);

    assert_eq!(rig.engine.scrub(50_000), 10_000);
    assert_eq!(rig.state("a.mp4"), TrackState::Ended);
    assert_eq!(rig.state("b.mp3"), TrackState::Ended);

    rig.tick();
    assert!(rig.engine.is_finished());
    assert_eq!(rig.engine.current_playhead_ms(), 10_000);
}

#[test]
fn test_scrub_past_buffering_track_releases_gate() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(5_000);
    let mut events = rig.engine.subscribe();

    rig.surface("b.mp3").starve();
    rig.engine.pump_events();
    assert!(rig.engine.is_globally_buffering());

    rig.engine.scrub(8_000);
    assert!(!rig.engine.is_globally_buffering());
    assert_eq!(rig.state("b.mp3"), TrackState::Ended);

    rig.tick();
    assert_eq!(rig.state("a.mp4"), TrackState::Active);
    let playhead = rig.advance(500);
    assert!((8_480..=8_520).contains(&playhead));

    let buffering: Vec<bool> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SyncEvent::BufferingChanged { is_buffering, .. } => Some(is_buffering),
            _ => None,
        })
        .collect();
    assert_eq!(buffering, vec![true, false]);
}

#[test]
fn test_buffering_report_from_ended_track_is_ignored() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(7_500);
    assert_eq!(rig.state("b.mp3"), TrackState::Ended);

    rig.surface("b.mp3").starve();
    rig.tick();
    assert!(!rig.engine.is_globally_buffering());
    assert_eq!(rig.state("b.mp3"), TrackState::Ended);
}

#[test]
fn test_scrub_gesture_holds_playhead_then_restores_play() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(2_000);

    rig.engine.scrub_begin();
    assert!(rig.engine.is_scrubbing());
    assert_eq!(rig.engine.play_toggle(), PlayToggle::Paused);

    rig.engine.scrub(6_000);
    rig.advance(200);
    rig.engine.scrub(6_500);
    assert_eq!(rig.advance(500), 6_500);
    assert_window_invariant(&rig.engine);

    rig.engine.scrub_end();
    assert!(!rig.engine.is_scrubbing());
    assert_eq!(rig.engine.play_toggle(), PlayToggle::Playing);
    assert_eq!(rig.state("b.mp3"), TrackState::Active);

    let playhead = rig.advance(300);
    assert!((6_780..=6_820).contains(&playhead));
    assert!((rig.position("b.mp3") - 2.8).abs() <= TOLERANCE_SEC);
}

#[test]
fn test_scrub_gesture_keeps_paused_state() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(1_000);
    rig.engine.toggle_play_pause();

    rig.engine.scrub_begin();
    rig.engine.scrub(3_000);
    rig.engine.scrub_end();

    assert_eq!(rig.engine.play_toggle(), PlayToggle::Paused);
    assert_eq!(rig.advance(1_000), 3_000);
}

#[test]
fn test_nested_scrub_begin_keeps_first_capture() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(1_000);

    rig.engine.scrub_begin();
    // Toggle is paused now; a second begin must not capture that
    rig.engine.scrub_begin();
    rig.engine.scrub_end();
    assert_eq!(rig.engine.play_toggle(), PlayToggle::Playing);

    // Unmatched end is harmless
    rig.engine.scrub_end();
    assert_eq!(rig.engine.play_toggle(), PlayToggle::Playing);
}

// ----- replay -----

#[test]
fn test_replay_recreates_tracks_under_new_generation() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(5_000);
    let old_master = rig.surface("a.mp4");
    assert_eq!(rig.factory.created(), 2);
    let mut events = rig.engine.subscribe();

    rig.engine.replay().unwrap();

    assert_eq!(rig.engine.generation(), 1);
    assert_eq!(rig.engine.shared().generation(), 1);
    assert_eq!(rig.factory.created(), 4);
    assert_eq!(rig.engine.current_playhead_ms(), 0);
    assert_eq!(rig.engine.total_duration_ms(), 10_000);
    assert_eq!(rig.engine.play_toggle(), PlayToggle::Playing);
    assert_eq!(rig.state("a.mp4"), TrackState::Active);
    assert_eq!(rig.state("b.mp3"), TrackState::Unstarted);
    assert!(old_master.is_paused());

    let replayed: Vec<u64> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SyncEvent::Replayed { generation, .. } => Some(generation),
            _ => None,
        })
        .collect();
    assert_eq!(replayed, vec![1]);

    // Callbacks from the discarded surfaces are dropped
    old_master.starve();
    rig.tick();
    assert!(!rig.engine.is_globally_buffering());

    // New surfaces are wired up
    rig.surface("a.mp4").starve();
    rig.tick();
    assert!(rig.engine.is_globally_buffering());
}

#[test]
fn test_replay_after_finish_plays_again() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(10_500);
    assert!(rig.engine.is_finished());

    rig.engine.replay().unwrap();
    assert!(!rig.engine.is_finished());
    assert!(!rig.engine.overlay().outro_overlay);

    rig.engine.pump_events();
    let playhead = rig.advance(1_000);
    assert!((980..=1_020).contains(&playhead));
}

#[test]
fn test_replay_clears_buffering() {
    let mut rig = TestRig::started(TWO_TRACKS);
    rig.advance_to(4_200);
    rig.surface("b.mp3").starve();
    rig.engine.pump_events();
    assert!(rig.engine.is_globally_buffering());

    rig.engine.replay().unwrap();
    assert!(!rig.engine.is_globally_buffering());
    assert!(!rig.engine.shared().is_globally_buffering());
    assert_eq!(rig.engine.buffering_count(), 0);
}

#[test]
fn test_populate_twice_is_rejected() {
    let mut rig = TestRig::new(TWO_TRACKS);
    let manifest = storysync_common::Manifest::from_json_str(TWO_TRACKS).unwrap();
    assert!(rig.engine.populate(manifest, ViewportClass::Desktop).is_err());
    assert_eq!(rig.engine.tracks().count(), 2);
}

// ----- drift -----

fn drift_of(rig: &TestRig, file: &str, start_ms: u64) -> f64 {
    let expected = (rig.engine.current_playhead_ms() - start_ms) as f64 / 1000.0;
    rig.position(file) - expected
}

#[test]
fn test_drift_converges_back_to_unity_rate() {
    let mut rig = TestRig::started(LONG_OVERLAP);
    rig.advance_to(2_000);
    assert_eq!(rig.state("c.mp3"), TrackState::Active);

    let c = rig.surface("c.mp3");
    c.nudge_position_sec(0.2);
    rig.tick();
    assert!(c.playback_rate() < 1.0, "ahead track should slow down");

    while rig.clock.now_ms() < 8_000 {
        rig.advance(16);
        let rate = c.playback_rate();
        assert!((0.5..=2.0).contains(&rate), "rate {} out of bounds", rate);
    }

    assert_eq!(c.playback_rate(), 1.0);
    assert!(drift_of(&rig, "c.mp3", 1_000).abs() <= TOLERANCE_SEC + 0.005);
    // Master is never rate-corrected
    assert_eq!(rig.surface("a.mp4").playback_rate(), 1.0);
}

#[test]
fn test_behind_track_speeds_up() {
    let mut rig = TestRig::started(LONG_OVERLAP);
    rig.advance_to(3_000);

    let c = rig.surface("c.mp3");
    c.nudge_position_sec(-0.5);
    rig.tick();
    assert!((c.playback_rate() - 1.25).abs() < 1e-3);
}

#[test]
fn test_large_drift_is_clamped() {
    let mut rig = TestRig::started(LONG_OVERLAP);
    rig.advance_to(2_000);

    let c = rig.surface("c.mp3");
    c.nudge_position_sec(5.0);
    rig.tick();
    assert_eq!(c.playback_rate(), 0.5);
}

// ----- watchdog -----

#[test]
fn test_watchdog_reports_long_stall_once() {
    let mut config = SyncConfig::default();
    config.timeline.stall_warning_ms = 1_000;
    let mut rig = TestRig::build(TWO_TRACKS, ViewportClass::Desktop, config, true);
    rig.engine.pump_events();
    rig.engine.start();
    rig.advance_to(4_400);
    let mut events = rig.engine.subscribe();

    rig.surface("b.mp3").starve();
    rig.engine.pump_events();
    rig.advance(900);
    assert!(drain_events(&mut events)
        .iter()
        .all(|event| !matches!(event, SyncEvent::StallWatchdog { .. })));

    rig.advance(3_000);
    let reports: Vec<(u64, usize)> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SyncEvent::StallWatchdog { stalled_for_ms, stalled_tracks, .. } => {
                Some((stalled_for_ms, stalled_tracks.len()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].0 >= 1_000);
    assert_eq!(reports[0].1, 1);

    // Detection only: the stall is still in place
    assert!(rig.engine.is_globally_buffering());
    assert_eq!(rig.engine.current_playhead_ms(), 4_400);
}
