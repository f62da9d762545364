//! Config command - manage configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use linecast_core::config::{sample_config, ConfigFile};
use std::path::PathBuf;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the effective configuration
    Show,

    /// Validate the configuration and report warnings
    Check,

    /// Generate a default config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    let path = args.file.unwrap_or_else(ConfigFile::default_path);

    match args.command {
        ConfigCommand::Path => {
            let state = if path.exists() { "exists" } else { "not created yet" };
            println!("{} ({})", path.display(), state);
        }
        ConfigCommand::Show => {
            if !path.exists() {
                println!("No configuration file at {}; showing defaults.", path.display());
                println!("Create one with: linecast config init\n");
            }
            let file = ConfigFile::load_from(path.clone())
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let text = toml::to_string_pretty(&file).context("Failed to render configuration")?;
            println!("{}", text);
        }
        ConfigCommand::Check => {
            let session = ConfigFile::load_from(path.clone())
                .with_context(|| format!("Failed to load {}", path.display()))?
                .session_config();

            if let Err(e) = session.validate_strict() {
                anyhow::bail!("{}: {}", path.display(), e);
            }
            let warnings = session.validate();
            if warnings.is_empty() {
                println!("{}: OK", path.display());
            }
            for warning in warnings {
                println!("warning: {}", warning);
            }
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            std::fs::write(&path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}
