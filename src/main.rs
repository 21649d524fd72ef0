use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use frameseq::playback::{resolve, EnvOverrides, QueryString};
use frameseq::scene::MockScene;
use frameseq::ui::ControlPanel;
use frameseq::{Collaborators, SequencePlayer, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Play a frame sequence against a simulated scene
#[derive(Debug, Parser)]
#[command(name = "frameseq", version)]
struct Args {
    /// Sequence overrides, e.g. '?sequencePath=/seq&fps=15&start=0&end=80'
    query: Option<String>,

    /// Prepare each frame off-screen and swap it in atomically
    #[arg(long)]
    flicker_free: bool,

    /// Simulated load latency in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 20)]
    latency: u64,

    /// Make this frame fail to load (repeatable)
    #[arg(long, value_name = "FRAME", allow_negative_numbers = true)]
    missing: Vec<i64>,

    /// Persist the resolved sequence settings to the user config directory
    #[arg(long)]
    save_settings: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut settings = Settings::load();
    let base = resolve(&settings.sequence, &EnvOverrides);

    let scene = Arc::new(MockScene::new().with_latency(Duration::from_millis(args.latency)));
    let mut collaborators = Collaborators::new()
        .loader(scene.clone())
        .disposer(scene.clone())
        .renderer(scene.clone());
    if args.flicker_free || settings.flicker_free {
        collaborators = collaborators.preparer(scene.clone()).swap(scene.clone());
    }

    // Create tokio runtime for the control loop
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    let panel = Arc::new(ControlPanel::with_ids(&settings.controls));
    let player = SequencePlayer::builder(base)
        .overrides(&QueryString::new(args.query.clone().unwrap_or_default()))
        .collaborators(collaborators)
        .controls(settings.controls.clone(), panel)
        .error_policy(settings.on_frame_error)
        .runtime(rt.handle().clone())
        .build()?;

    let config = player.config();
    for frame in &args.missing {
        scene.fail_url(&config.frame_url(*frame));
    }

    if args.save_settings {
        settings.sequence = config.clone();
        settings.flicker_free = player.is_flicker_free();
        settings.save()?;
        info!("Saved settings to {:?}", Settings::config_path());
    }

    info!(
        "Playing {} frames from {} at {} fps ({} swap)",
        config.frame_count(),
        config.frame_url(config.start_frame),
        config.fps,
        if player.is_flicker_free() { "flicker-free" } else { "simple" }
    );

    player.start();
    rt.block_on(player.wait_stopped());

    let status = player.status();
    let elapsed = status
        .started_at
        .map(|started| (Utc::now() - started).num_milliseconds())
        .unwrap_or_default();
    let displayed = scene.display_history().iter().filter(|model| model.is_some()).count();

    info!(
        "Finished at frame {} after {} ms: {} frames requested, {} displayed",
        status.current_frame,
        elapsed,
        scene.requested_urls().len(),
        displayed
    );

    Ok(())
}
