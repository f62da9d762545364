//! Error types for Linecast

use thiserror::Error;

/// Result type alias using LinecastError
pub type Result<T> = std::result::Result<T, LinecastError>;

/// Main error type for Linecast operations
#[derive(Debug, Error)]
pub enum LinecastError {
    /// Could not reach the consumer (refused, timed out, unreachable)
    #[error("Connection error: {0}")]
    Connection(String),

    /// A write to the live transport failed mid-send
    #[error("Transport error: {0}")]
    Transport(String),

    /// A literal tag did not match during GPLA decoding
    #[error("Corrupt GPLA data at offset {offset}: expected {expected:?}, found {found:?}")]
    Corrupt {
        /// Byte offset of the offending field
        offset: usize,
        /// What the decoder expected at this point
        expected: String,
        /// What was actually present
        found: String,
    },

    /// The GPLA stream ended before a field could be read
    #[error("Truncated GPLA data at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// GPLA major version this decoder does not understand
    #[error("Unsupported GPLA version {major}.{minor}.{patch}")]
    UnsupportedVersion { major: u64, minor: u64, patch: u64 },

    /// Header frame count disagrees with the frames present
    #[error("GPLA header declares {declared} frames but {actual} are present")]
    FrameCountMismatch { declared: u64, actual: u64 },

    /// No camera is designated in the scene
    #[error("Scene has no active camera")]
    NoCamera,

    /// Camera world transform cannot be inverted
    #[error("Camera transform is not invertible (determinant {0})")]
    DegenerateCamera(f64),

    /// Frame could not be encoded in the selected format
    #[error("Encode error: {0}")]
    Encode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LinecastError>,
    },
}

impl LinecastError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an encode error
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a corruption error for a tag mismatch
    pub fn corrupt(offset: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Corrupt {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &LinecastError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the user can fix this without a code change (reconnect,
    /// start the consumer, pick a camera, edit the config)
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self.root(),
            Self::Connection(_)
                | Self::Transport(_)
                | Self::NoCamera
                | Self::DegenerateCamera(_)
                | Self::Config(_)
        )
    }

    /// Short hint for the user, if there is an obvious next step
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::Connection(_) => {
                Some("Make sure the consumer is running and listening on the configured host:port")
            }
            Self::Transport(_) => Some("The consumer went away; reconnect to resume streaming"),
            Self::NoCamera => Some("Designate a scene camera before capturing"),
            Self::DegenerateCamera(_) => Some("The camera has a zero scale; fix its transform"),
            Self::Config(_) => Some("Check ~/.config/linecast/config.toml"),
            Self::Corrupt { .. } | Self::Truncated { .. } | Self::FrameCountMismatch { .. } => {
                Some("The file is damaged or not a GPLA recording")
            }
            Self::UnsupportedVersion { .. } => {
                Some("The file was written by a newer exporter; upgrade linecast")
            }
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
