//! Headless player (storysync-player) - Main entry point
//!
//! Plays a timeline manifest against simulated surfaces on the system
//! clock and logs engine events. Useful for checking a manifest's timing
//! (total duration, track windows, outro) without a presentation layer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use storysync_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use storysync_common::events::SyncEvent;
use storysync_common::time::format_playhead;
use storysync_common::{Manifest, ViewportClass};
use storysync_player::playback::{Scheduler, SimulatedSurfaceFactory, SystemClock};
use storysync_player::{SyncConfig, SyncEngine};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for storysync-player
#[derive(Parser, Debug)]
#[command(name = "storysync-player")]
#[command(about = "Headless synchronized multi-track player")]
#[command(version)]
struct Args {
    /// Timeline manifest (JSON)
    #[arg(short, long, env = "STORYSYNC_MANIFEST")]
    manifest: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Viewport width in pixels (selects mobile or desktop items)
    #[arg(short, long, default_value = "1280", env = "STORYSYNC_VIEWPORT_WIDTH")]
    width: u32,

    /// Simulated media length for sources without an authored duration
    #[arg(long, default_value = "30")]
    media_secs: f64,

    /// Simulate a stall on the master track at this playhead (ms)
    #[arg(long)]
    stall_at_ms: Option<u64>,

    /// How long the simulated stall lasts (ms)
    #[arg(long, default_value = "1500")]
    stall_for_ms: u64,

    /// Print every engine event as a JSON line on stdout
    #[arg(long)]
    json_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let config = SyncConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    let default_filter = format!(
        "storysync_player={level},storysync_common={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("No configuration file; using defaults"),
    }

    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let viewport = ViewportClass::from_width(args.width, config.timeline.mobile_breakpoint_px);
    info!(
        "Manifest {}: {} items, {} chapters, {} viewport",
        args.manifest.display(),
        manifest.items.len(),
        manifest.chapters.len(),
        viewport
    );

    let clock = Arc::new(SystemClock::new());
    let factory = Arc::new(
        SimulatedSurfaceFactory::new(clock.clone()).default_media_duration(args.media_secs),
    );

    let mut engine = SyncEngine::new(config, clock, factory.clone());
    engine
        .populate(manifest, viewport)
        .context("Failed to build tracks")?;
    let master = engine.master_track_id();
    let mut events = engine.subscribe();
    engine.start();

    let (handle, task) = Scheduler::spawn(engine);

    if let (Some(stall_at_ms), Some(master)) = (args.stall_at_ms, master) {
        let shared = handle.shared();
        let factory = Arc::clone(&factory);
        let stall_for = Duration::from_millis(args.stall_for_ms);
        tokio::spawn(async move {
            while shared.current_playhead_ms() < stall_at_ms {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            if let Some(surface) = factory.handle_by_id(master) {
                info!("Simulating stall on master for {}ms", stall_for.as_millis());
                surface.starve();
                tokio::time::sleep(stall_for).await;
                surface.recover();
            }
        });
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = events.recv() => match received {
                Ok(event) => {
                    let finished = matches!(event, SyncEvent::ProgramFinished { .. });
                    log_event(&event, args.json_events)?;
                    if finished {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Event listener lagged; {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown();
    let engine = task.await.context("Scheduler task failed")?;
    info!(
        "Stopped at {} of {}",
        format_playhead(engine.current_playhead_ms()),
        format_playhead(engine.total_duration_ms())
    );
    Ok(())
}

fn log_event(event: &SyncEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    }
    match event {
        SyncEvent::PlayheadUpdated { playhead_ms, total_duration_ms, .. } => {
            trace!("{} / {}", format_playhead(*playhead_ms), format_playhead(*total_duration_ms));
        }
        SyncEvent::TrackStateChanged { track_id, old_state, new_state, playhead_ms, .. } => {
            info!("{} track {} {} -> {}", format_playhead(*playhead_ms), track_id, old_state, new_state);
        }
        other => info!("{}", other.event_type()),
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
