//! Export command - record a scene into a .gpla file

use anyhow::{Context, Result};
use clap::Args;
use linecast_core::{
    builder::FrameBuilder,
    recording::{self, ExportFormat, Recorder},
    ScriptedScene,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use super::SessionArgs;

/// Arguments for the export command
#[derive(Args)]
pub struct ExportArgs {
    /// Scene description (JSON)
    scene: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "scene.gpla")]
    output: PathBuf,

    /// Write base64 text instead of raw binary
    #[arg(long, conflicts_with = "json")]
    base64: bool,

    /// Write a JSON frames document (keeps object names)
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    session: SessionArgs,
}

/// Record every frame of the scene and write it out
pub async fn export(args: ExportArgs) -> Result<()> {
    let file = args.session.config_file()?;
    let config = args.session.resolve()?;
    let format = if args.json {
        ExportFormat::Json
    } else if args.base64 || file.export.base64 {
        ExportFormat::Base64
    } else {
        ExportFormat::Binary
    };

    let mut scene = ScriptedScene::load(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\nInterrupted, finishing with the frames captured so far...");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let recorder = Recorder::new(FrameBuilder::new(config.focal_scale)).with_cancel(cancel);
    let recording = tokio::task::spawn_blocking(move || recorder.record(&mut scene))
        .await
        .context("Recording task failed")?
        .context("Failed to record scene")?;

    if recording.frames.is_empty() {
        anyhow::bail!("Nothing was recorded; {} left untouched", args.output.display());
    }

    let bytes = recording::export(&recording, &args.output, format)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!("Export complete");
    println!(
        "Wrote {} frames @ {} fps ({:.2}s) to {} ({} bytes)",
        recording.frame_count(),
        recording.frame_rate,
        recording.duration_secs(),
        args.output.display(),
        bytes
    );

    Ok(())
}
