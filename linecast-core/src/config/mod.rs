//! Configuration types for Linecast
//!
//! Provides the runtime session configuration and the on-disk config file.

mod file;

pub use file::{sample_config, CaptureSettings, ConfigFile, ConnectionSettings, ExportSettings};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::codec::{JsonSchema, Protocol};

/// Default consumer host
pub const DEFAULT_HOST: &str = "localhost";

/// Default consumer port
pub const DEFAULT_PORT: u16 = 51677;

/// Historical consumer port range
pub const PORT_RANGE: std::ops::RangeInclusive<u16> = 51600..=51699;

/// Default connection attempt timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Lens-to-focal-length factor of the current consumer
pub const DEFAULT_FOCAL_SCALE: f64 = -0.05;

/// Factor used by early consumers
pub const LEGACY_FOCAL_SCALE: f64 = -0.1;

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Consumer host name or address
    pub host: String,
    /// Consumer port
    pub port: u16,
    /// Bounded connection attempt
    pub connect_timeout: Duration,
    /// Wire protocol
    pub protocol: Protocol,
    /// JSON payload schema (JSON protocol only)
    pub json_schema: JsonSchema,
    /// Focal length = focal_scale * lens millimeters
    pub focal_scale: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            protocol: Protocol::default(),
            json_schema: JsonSchema::default(),
            focal_scale: DEFAULT_FOCAL_SCALE,
        }
    }
}

impl SessionConfig {
    /// Set the consumer host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the consumer port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the wire protocol
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the JSON schema
    pub fn with_json_schema(mut self, schema: JsonSchema) -> Self {
        self.json_schema = schema;
        self
    }

    /// Set the lens-to-focal-length factor
    pub fn with_focal_scale(mut self, scale: f64) -> Self {
        self.focal_scale = scale;
        self
    }

    /// `host:port` for connecting
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration and return any warnings
    ///
    /// An empty list means the configuration looks good.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !PORT_RANGE.contains(&self.port) {
            warnings.push(format!(
                "Port {} is outside the usual consumer range {}-{}.",
                self.port,
                PORT_RANGE.start(),
                PORT_RANGE.end()
            ));
        }

        if self.connect_timeout > Duration::from_secs(5) {
            warnings.push(format!(
                "Connect timeout of {:?} can stall the host while the consumer is down.",
                self.connect_timeout
            ));
        }

        if self.focal_scale != DEFAULT_FOCAL_SCALE && self.focal_scale != LEGACY_FOCAL_SCALE {
            warnings.push(format!(
                "Focal scale {} matches no known consumer ({} current, {} legacy).",
                self.focal_scale, DEFAULT_FOCAL_SCALE, LEGACY_FOCAL_SCALE
            ));
        }

        if self.protocol == Protocol::Gpla && self.json_schema != JsonSchema::default() {
            warnings.push("JSON schema is ignored with the GPLA protocol.".to_string());
        }

        warnings
    }

    /// Validate and return an error if configuration is invalid
    pub fn validate_strict(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("Port cannot be zero".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("Connect timeout cannot be zero".to_string());
        }

        if !self.focal_scale.is_finite() || self.focal_scale == 0.0 {
            return Err(format!(
                "Focal scale {} must be a finite non-zero number",
                self.focal_scale
            ));
        }

        Ok(())
    }
}
