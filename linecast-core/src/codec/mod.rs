//! Wire formats
//!
//! Two version-gated formats, never auto-negotiated:
//! - Line-JSON: one newline-terminated JSON document per frame
//! - GPLA: tag-chunked binary container, base64-wrapped on the socket

pub mod gpla;
pub mod json;
mod message;

pub use json::{decode_line, encode_line, EncodedLine, FrameMessage, JsonSchema, ObjectMessage};
pub use message::{Message, CLOSE_SENTINEL};

use serde::{Deserialize, Serialize};

/// Stream protocol spoken to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Newline-delimited JSON documents
    Json,
    /// Base64-wrapped GPLA snapshots
    #[default]
    Gpla,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Gpla => write!(f, "gpla"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "gpla" | "binary" => Ok(Self::Gpla),
            _ => Err(format!("Unknown protocol: {}", s)),
        }
    }
}
