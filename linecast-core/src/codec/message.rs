//! Stream message classification
//!
//! What a consumer sees on the socket, one line at a time.

use super::gpla::{self, BASE64_PREFIX};
use super::json::{self, FrameMessage};
use crate::error::Result;
use crate::types::Frame;

/// Sentinel sent before an intentional disconnect
pub const CLOSE_SENTINEL: &[u8] = b"CLOSE\n";

/// One decoded stream line
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The sender is disconnecting
    Close,
    /// A base64 GPLA single-frame snapshot
    Snapshot(Frame),
    /// A line-JSON frame
    Json(FrameMessage),
}

impl Message {
    /// Classify and decode one line (with or without its `\n`)
    pub fn parse(line: &[u8]) -> Result<Self> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if line == b"CLOSE" {
            Ok(Self::Close)
        } else if line.starts_with(BASE64_PREFIX.as_bytes()) {
            Ok(Self::Snapshot(gpla::decode_snapshot_line(line)?))
        } else {
            Ok(Self::Json(json::decode_line(line)?))
        }
    }

    /// The frame carried by this message, if any
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Close => None,
            Self::Snapshot(frame) => Some(frame),
            Self::Json(message) => Some(message.into_frame()),
        }
    }
}
