//! Stream command - play a scene into a live consumer

use anyhow::{Context, Result};
use clap::Args;
use linecast_core::{
    session::{SendOutcome, Session, Trigger},
    source::GeometrySource,
    ScriptedScene,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info, warn};

use super::SessionArgs;

/// Arguments for the stream command
#[derive(Args)]
pub struct StreamArgs {
    /// Scene description (JSON)
    scene: PathBuf,

    #[command(flatten)]
    session: SessionArgs,

    /// Playback rate override in frames per second
    #[arg(long)]
    fps: Option<u64>,

    /// Restart from the first frame after the last one
    #[arg(long = "loop")]
    repeat: bool,
}

/// Stream a scene until it ends or Ctrl+C
pub async fn stream(args: StreamArgs) -> Result<()> {
    println!("Linecast - Streaming\n");

    let config = args.session.resolve()?;
    let mut scene = ScriptedScene::load(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;

    let (start, end) = scene.frame_range();
    let fps = args.fps.unwrap_or_else(|| scene.frame_rate()).max(1);
    let repeat = args.repeat;

    println!("Configuration:");
    println!("  Consumer:    {}", config.address());
    println!("  Protocol:    {}", config.protocol);
    println!("  JSON schema: {}", config.json_schema);
    println!("  Focal scale: {}", config.focal_scale);
    println!("  Frames:      {}..={} @ {} fps", start, end, fps);
    println!();

    let mut session = Session::new(config);
    scene.advance_to_frame(start);
    if let Err(e) = session.connect(&scene).await {
        if let Some(hint) = e.user_hint() {
            eprintln!("Hint: {}", hint);
        }
        return Err(e).context("Failed to start streaming");
    }

    println!("Connected. Press Ctrl+C to stop...\n");

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
    // connect already sent the first frame
    ticker.tick().await;

    let playback = async {
        loop {
            for frame in start..=end {
                ticker.tick().await;
                scene.advance_to_frame(frame);
                match session.handle(Trigger::FrameChange, &scene).await {
                    Ok(SendOutcome::Sent { bytes }) => debug!("Frame {} sent ({} bytes)", frame, bytes),
                    Ok(SendOutcome::Unchanged) => debug!("Frame {} unchanged", frame),
                    Ok(SendOutcome::NotConnected) => {
                        return Err(anyhow::anyhow!("Consumer disconnected"));
                    }
                    Err(e) if session.is_connected() => warn!("Frame {} not sent: {}", frame, e),
                    Err(e) => return Err(anyhow::Error::from(e).context("Streaming stopped")),
                }
            }
            if !repeat {
                return Ok(());
            }
        }
    };

    let result = tokio::select! {
        r = playback => r,
        _ = signal::ctrl_c() => {
            println!("\nReceived interrupt signal...");
            Ok(())
        }
    };

    session.shutdown().await;

    let stats = session.stats();
    info!("Streaming finished");
    println!("Frames sent:    {}", stats.frames_sent);
    println!("Frames skipped: {}", stats.frames_skipped);
    println!("Bytes written:  {}", stats.bytes_written);

    result
}
