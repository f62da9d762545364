//! Configuration file loading and merging
//!
//! Loads user configuration from `~/.config/linecast/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    SessionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FOCAL_SCALE, DEFAULT_HOST, DEFAULT_PORT,
};
use crate::codec::{JsonSchema, Protocol};
use crate::error::{LinecastError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Consumer connection settings
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Capture and wire format settings
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Recording export settings
    #[serde(default)]
    pub export: ExportSettings,
}

/// Consumer connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Consumer host
    #[serde(default = "default_host")]
    pub host: String,

    /// Consumer port (usually 51600-51699)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connection attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Wire protocol (json, gpla)
    #[serde(default)]
    pub protocol: Protocol,

    /// JSON payload schema (path-vertices-v0, mesh-v1, strokes-v2)
    #[serde(default)]
    pub json_schema: JsonSchema,

    /// Focal length = focal_scale * lens millimeters
    #[serde(default = "default_focal_scale")]
    pub focal_scale: f64,
}

/// Recording export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Write base64 text instead of raw binary
    #[serde(default)]
    pub base64: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_focal_scale() -> f64 {
    DEFAULT_FOCAL_SCALE
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            json_schema: JsonSchema::default(),
            focal_scale: default_focal_scale(),
        }
    }
}

impl ConfigFile {
    /// `<config_dir>/linecast/config.toml`, falling back to `~/.config`
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("/etc"));
        base.join("linecast").join("config.toml")
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(LinecastError::config(format!("Cannot read {:?}: {}", path, e))),
        };

        let config = toml::from_str(&content)
            .map_err(|e| LinecastError::config(format!("Cannot parse {:?}: {}", path, e)))?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the default file, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!("{}; using default settings", e);
            Self::default()
        })
    }

    /// Write configuration to `path`, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LinecastError::config(format!("Cannot create {:?}: {}", parent, e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| LinecastError::config(format!("Cannot serialize configuration: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| LinecastError::config(format!("Cannot write {:?}: {}", path, e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Runtime session configuration from the file settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            host: self.connection.host.clone(),
            port: self.connection.port,
            connect_timeout: Duration::from_millis(self.connection.connect_timeout_ms),
            protocol: self.capture.protocol,
            json_schema: self.capture.json_schema,
            focal_scale: self.capture.focal_scale,
        }
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Linecast Configuration

[connection]
# Consumer host and port (consumers usually listen on 51600-51699)
host = "localhost"
port = 51677

# Give up connecting after this many milliseconds
connect_timeout_ms = 1000

[capture]
# Wire protocol: "json" (newline-delimited JSON) or "gpla" (base64 GPLA snapshots)
protocol = "gpla"

# JSON payload schema (json protocol only):
#   "path-vertices-v0" - flat path, strokes separated by NaN points
#   "mesh-v1"    - vertices + edges, sent once per connection
#   "strokes-v2" - array of strokes, sent every frame
json_schema = "strokes-v2"

# Focal length = focal_scale * camera lens (mm)
# -0.05 for current consumers, -0.1 for early ones
focal_scale = -0.05

[export]
# Write .gpla recordings as base64 text instead of raw binary
base64 = false
"#
    .to_string()
}
