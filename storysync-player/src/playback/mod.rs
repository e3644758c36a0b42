//! Synchronized multi-track playback
//!
//! Timing flows one way (scheduler → playhead → window controller →
//! tracks); feedback flows back through surface events (→ registry and
//! buffering gate → pause/resume).

pub mod clock;
pub mod drift;
pub mod engine;
pub mod gate;
pub mod phase;
pub mod registry;
pub mod scheduler;
pub mod scrub;
pub mod simulated;
pub mod source;
pub mod surface;
pub mod track;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::SyncEngine;
pub use phase::OverlayState;
pub use scheduler::{EngineCommand, Scheduler, SchedulerHandle};
pub use simulated::{SimulatedHandle, SimulatedSurface, SimulatedSurfaceFactory};
pub use surface::{PlaybackSurface, SurfaceEnvelope, SurfaceError, SurfaceEvent, SurfaceFactory};
pub use track::Track;
