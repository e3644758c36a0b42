//! Tick scheduler
//!
//! Runs a [`SyncEngine`] on a tokio task: one tick per display refresh,
//! surface events applied as they arrive, UI commands applied between ticks.
//! All of it happens on a single task, so engine logic never runs in
//! parallel with itself.

use super::engine::SyncEngine;
use super::surface::SurfaceEnvelope;
use crate::state::SharedSyncState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// UI requests forwarded to the engine task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    Start,
    TogglePlayPause,
    Scrub(u64),
    ScrubBegin,
    ScrubEnd,
    Replay,
}

/// Control side of a running scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    shutdown: Arc<watch::Sender<bool>>,
    shared: Arc<SharedSyncState>,
}

impl SchedulerHandle {
    /// Queue a command; returns false if the scheduler has stopped
    pub fn send(&self, command: EngineCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn toggle_play_pause(&self) -> bool {
        self.send(EngineCommand::TogglePlayPause)
    }

    pub fn scrub(&self, target_ms: u64) -> bool {
        self.send(EngineCommand::Scrub(target_ms))
    }

    pub fn scrub_begin(&self) -> bool {
        self.send(EngineCommand::ScrubBegin)
    }

    pub fn scrub_end(&self) -> bool {
        self.send(EngineCommand::ScrubEnd)
    }

    pub fn replay(&self) -> bool {
        self.send(EngineCommand::Replay)
    }

    /// Published engine outputs
    pub fn shared(&self) -> Arc<SharedSyncState> {
        Arc::clone(&self.shared)
    }

    /// Ask the scheduler loop to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

pub struct Scheduler;

impl Scheduler {
    /// Spawn the engine loop on the current runtime
    ///
    /// The join handle yields the engine back once the loop stops.
    pub fn spawn(engine: SyncEngine) -> (SchedulerHandle, JoinHandle<SyncEngine>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = SchedulerHandle {
            commands: command_tx,
            shutdown: Arc::new(shutdown_tx),
            shared: engine.shared(),
        };
        let task = tokio::spawn(Self::run(engine, command_rx, shutdown_rx));
        (handle, task)
    }

    /// Drive the engine until shutdown or until every handle is dropped
    pub async fn run(
        mut engine: SyncEngine,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) -> SyncEngine {
        let period = Duration::from_millis(engine.config().timeline.tick_interval_ms);
        let mut ticker = interval(period);
        // A late tick is just skipped; the playhead catches up from the clock
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut surface_events = engine.take_event_receiver();
        if surface_events.is_none() {
            warn!("Surface event receiver already taken; events will not be applied");
        }

        info!("Scheduler started ({}ms tick)", period.as_millis());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    engine.tick();
                }
                Some(envelope) = next_surface_event(&mut surface_events) => {
                    engine.handle_surface_event(envelope);
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => apply_command(&mut engine, command),
                        None => {
                            debug!("All scheduler handles dropped");
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            "Scheduler stopped at {}ms (generation {})",
            engine.current_playhead_ms(),
            engine.generation()
        );
        engine
    }
}

async fn next_surface_event(
    rx: &mut Option<mpsc::UnboundedReceiver<SurfaceEnvelope>>,
) -> Option<SurfaceEnvelope> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Apply one UI command to the engine
pub fn apply_command(engine: &mut SyncEngine, command: EngineCommand) {
    debug!("Command: {:?}", command);
    match command {
        EngineCommand::Start => engine.start(),
        EngineCommand::TogglePlayPause => {
            engine.toggle_play_pause();
        }
        EngineCommand::Scrub(target_ms) => {
            engine.scrub(target_ms);
        }
        EngineCommand::ScrubBegin => engine.scrub_begin(),
        EngineCommand::ScrubEnd => engine.scrub_end(),
        EngineCommand::Replay => {
            if let Err(e) = engine.replay() {
                warn!("Replay failed: {}", e);
            }
        }
    }
}
