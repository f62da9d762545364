//! Inspect command - summarize a .gpla file

use anyhow::{Context, Result};
use clap::Args;
use linecast_core::recording;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the inspect command
#[derive(Args)]
pub struct InspectArgs {
    /// Recording to read (binary or base64)
    file: PathBuf,

    /// List every frame
    #[arg(short, long)]
    frames: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    frame_rate: u64,
    frame_count: u64,
    duration_secs: f64,
    frames: Vec<FrameSummary>,
}

#[derive(Serialize)]
struct FrameSummary {
    index: usize,
    focal_length: f64,
    objects: usize,
    strokes: usize,
    points: usize,
}

/// Decode a recording and print what it holds
pub async fn inspect(args: InspectArgs) -> Result<()> {
    let rec = match recording::import(&args.file) {
        Ok(rec) => rec,
        Err(e) => {
            if let Some(hint) = e.user_hint() {
                eprintln!("Hint: {}", hint);
            }
            return Err(e).with_context(|| format!("Failed to read {}", args.file.display()));
        }
    };

    let summary = Summary {
        frame_rate: rec.frame_rate,
        frame_count: rec.frame_count(),
        duration_secs: rec.duration_secs(),
        frames: rec
            .frames
            .iter()
            .enumerate()
            .map(|(index, f)| FrameSummary {
                index,
                focal_length: f.focal_length,
                objects: f.objects.len(),
                strokes: f.stroke_count(),
                points: f.point_count(),
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Recording: {}\n", args.file.display());
    println!("  Frames:     {}", summary.frame_count);
    println!("  Frame rate: {} fps", summary.frame_rate);
    println!("  Duration:   {:.2}s", summary.duration_secs);

    if args.frames {
        println!();
        println!("  {:>6}  {:>10}  {:>7}  {:>7}  {:>8}", "Frame", "Focal", "Objects", "Strokes", "Points");
        for f in &summary.frames {
            println!(
                "  {:>6}  {:>10.4}  {:>7}  {:>7}  {:>8}",
                f.index, f.focal_length, f.objects, f.strokes, f.points
            );
        }
    }

    Ok(())
}
