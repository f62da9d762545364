//! Linecast CLI
//!
//! Stream line art scenes to a live consumer and export `.gpla` recordings.
//!
//! # Usage
//!
//! ```bash
//! # Stream a scene to the consumer on the default port
//! linecast stream scene.json
//!
//! # Export every frame of a scene
//! linecast export scene.json -o scene.gpla
//!
//! # Look inside a recording
//! linecast inspect scene.gpla
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Linecast - stream and export captured line art scenes
#[derive(Parser)]
#[command(name = "linecast")]
#[command(author = "GhostKellz")]
#[command(version)]
#[command(about = "Stream and export captured line art scenes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scene and stream each frame to a consumer
    Stream(commands::StreamArgs),

    /// Record every frame of a scene into a .gpla file
    Export(commands::ExportArgs),

    /// Show the contents of a .gpla file
    Inspect(commands::InspectArgs),

    /// Act as a consumer and print the frames received
    Listen(commands::ListenArgs),

    /// Manage configuration
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("linecast={}", level).parse().context("Invalid log directive")?)
        .add_directive(
            format!("linecast_core={}", level)
                .parse()
                .context("Invalid log directive")?,
        );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Run the appropriate command
    match cli.command {
        Commands::Stream(args) => commands::stream(args).await?,
        Commands::Export(args) => commands::export(args).await?,
        Commands::Inspect(args) => commands::inspect(args).await?,
        Commands::Listen(args) => commands::listen(args).await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
