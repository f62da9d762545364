//! Multi-frame recording and `.gpla` export
//!
//! A recording is captured completely before anything touches the disk, and
//! the encoded file is written to a uniquely named, synced temporary file in
//! the target directory and renamed into place. A failed capture or write
//! never leaves a file whose header claims more frames than it holds.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::builder::FrameBuilder;
use crate::codec::{gpla, json};
use crate::error::{LinecastError, Result};
use crate::source::GeometrySource;
use crate::types::SceneRecording;

/// On-disk container flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Raw binary GPLA
    #[default]
    Binary,
    /// Base64 text of the binary container
    Base64,
    /// `{"frames":[...]}` document; keeps object names
    Json,
}

/// Captures every frame of a source's timeline
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    builder: FrameBuilder,
    cancel: Option<Arc<AtomicBool>>,
}

impl Recorder {
    /// Create a recorder using `builder` for each frame
    pub fn new(builder: FrameBuilder) -> Self {
        Self {
            builder,
            cancel: None,
        }
    }

    /// Stop early once `flag` becomes true
    ///
    /// Frames captured before the flag was seen are kept.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Walk the frame range and capture each frame
    ///
    /// Any capture error aborts the whole recording.
    pub fn record(&self, source: &mut dyn GeometrySource) -> Result<SceneRecording> {
        let (start, end) = source.frame_range();
        let mut frames = Vec::new();

        for number in start..=end {
            if self.cancelled() {
                info!("Recording interrupted after {} frames", frames.len());
                break;
            }
            source.advance_to_frame(number);
            let frame = self
                .builder
                .build(&*source)
                .map_err(|e| e.with_context(format!("Capturing frame {}", number)))?;
            frames.push(frame);
        }

        debug!("Recorded frames {}..={} ({} captured)", start, end, frames.len());
        Ok(SceneRecording::new(source.frame_rate(), frames))
    }
}

/// Encode `recording` in `format`
pub fn encode(recording: &SceneRecording, format: ExportFormat) -> Result<Vec<u8>> {
    let mut bytes = match format {
        ExportFormat::Binary => return gpla::encode_recording(recording),
        ExportFormat::Base64 => gpla::to_base64(&gpla::encode_recording(recording)?).into_bytes(),
        ExportFormat::Json => json::encode_frames_document(recording)?,
    };
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `bytes` so that `path` either keeps its old content or gets all of it
///
/// The temporary file is dropped (and so removed) on any failure.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| LinecastError::Io(e).with_context(format!("Creating temporary file in {:?}", dir)))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| LinecastError::Io(e).with_context(format!("Writing {:?}", tmp.path())))?;

    tmp.persist(path).map_err(|e| {
        warn!("Rename of {:?} failed, removing partial file", e.file.path());
        LinecastError::Io(e.error).with_context(format!("Replacing {:?}", path))
    })?;
    Ok(())
}

/// Encode and write a recording; returns the number of bytes written
pub fn export(recording: &SceneRecording, path: impl AsRef<Path>, format: ExportFormat) -> Result<u64> {
    let path = path.as_ref();
    let bytes = encode(recording, format)?;
    write_atomically(path, &bytes)?;

    info!(
        "Exported {} frames @ {} fps to {:?} ({} bytes)",
        recording.frame_count(),
        recording.frame_rate,
        path,
        bytes.len()
    );
    Ok(bytes.len() as u64)
}

/// Read a `.gpla` file: binary, base64 text or a JSON frames document
pub fn import(path: impl AsRef<Path>) -> Result<SceneRecording> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    gpla::decode_file_bytes(&bytes).map_err(|e| e.with_context(format!("Decoding {:?}", path)))
}
