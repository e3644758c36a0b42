//! Test helper modules for storysync-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - TestRig: engine on a manual clock with simulated surfaces
//! - Manifests: timelines shared by the scenario tests
//! - Invariant checks run after ticks and transitions

#![allow(dead_code)]

pub mod manifests;
pub mod test_rig;

pub use test_rig::{assert_window_invariant, drain_events, TestRig};
