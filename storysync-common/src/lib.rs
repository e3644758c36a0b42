//! # storysync common library
//!
//! Shared code for the storysync crates including:
//! - Error type
//! - Timestamp parsing
//! - Timeline manifest model
//! - Event types and EventBus
//! - Configuration file discovery

pub mod config;
pub mod error;
pub mod events;
pub mod manifest;
pub mod time;

pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestItem, ViewportClass};
