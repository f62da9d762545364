//! CLI command implementations

mod config;
mod export;
mod inspect;
mod listen;
mod stream;

pub use config::{config, ConfigArgs};
pub use export::{export, ExportArgs};
pub use inspect::{inspect, InspectArgs};
pub use listen::{listen, ListenArgs};
pub use stream::{stream, StreamArgs};

use anyhow::{Context, Result};
use clap::Args;
use linecast_core::codec::{JsonSchema, Protocol};
use linecast_core::config::{ConfigFile, SessionConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Settings that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Consumer host
    #[arg(long)]
    pub host: Option<String>,

    /// Consumer port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Connect timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Wire protocol (json, gpla)
    #[arg(long)]
    pub protocol: Option<Protocol>,

    /// JSON payload schema (path-vertices-v0, mesh-v1, strokes-v2)
    #[arg(long)]
    pub schema: Option<JsonSchema>,

    /// Focal length scale applied to the camera lens (e.g. -0.05)
    #[arg(long, allow_negative_numbers = true)]
    pub focal_scale: Option<f64>,
}

impl SessionArgs {
    /// Load the config file this command should use
    pub fn config_file(&self) -> Result<ConfigFile> {
        let file = match &self.config {
            Some(path) => ConfigFile::load_from(path.clone())
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ConfigFile::load_or_default(),
        };
        Ok(file)
    }

    /// Merge the config file with command line overrides
    pub fn resolve(&self) -> Result<SessionConfig> {
        let mut config = self.config_file()?.session_config();

        if let Some(host) = &self.host {
            config = config.with_host(host.clone());
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_connect_timeout(Duration::from_millis(ms));
        }
        if let Some(protocol) = self.protocol {
            config = config.with_protocol(protocol);
        }
        if let Some(schema) = self.schema {
            config = config.with_json_schema(schema);
        }
        if let Some(scale) = self.focal_scale {
            config = config.with_focal_scale(scale);
        }

        for warning in config.validate() {
            tracing::warn!("{}", warning);
        }
        config
            .validate_strict()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

        Ok(config)
    }
}
