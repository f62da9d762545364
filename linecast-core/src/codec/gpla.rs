//! GPLA tag-chunked binary container
//!
//! Every structural section starts with an 8-byte space-padded ASCII tag and
//! ends with `DONE    `. Integers are 8-byte little-endian unsigned, floats
//! are 8-byte IEEE-754 doubles (little-endian).
//!
//! ```text
//! File        := "GPLA    " major minor patch FileInfo Frame+ "END GPLA"
//! FileInfo    := "FILE    " "fCount  " u64 "fRate   " u64 "DONE    "
//! Frame       := "FRAME   " "focalLen" f64 Objects "DONE    "
//! Objects     := "OBJECTS " Object* "DONE    "
//! Object      := "OBJECT  " Matrix Strokes "DONE    "
//! Matrix      := "MATRIX  " f64 x 16 "DONE    "
//! Strokes     := "STROKES " Stroke* "DONE    "
//! Stroke      := "STROKE  " "vertexCt" u64 Vertices "DONE    "
//! Vertices    := "VERTICES" (f64 f64 f64) x count "DONE    "
//! ```
//!
//! Decoding is strict: any tag mismatch, truncation, unknown major version,
//! trailing data or frame count disagreement is fatal and reports the byte
//! offset. Objects carry no name in this format; decoded objects have an
//! empty name.

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, trace};

use super::json;
use crate::error::{LinecastError, Result};
use crate::types::{CapturedObject, Frame, Matrix4, SceneRecording, Stroke, Vec3};

/// Width of every tag and scalar field
pub const FIELD_LEN: usize = 8;

/// An 8-byte section tag
pub type Tag = [u8; FIELD_LEN];

pub const TAG_MAGIC: Tag = *b"GPLA    ";
pub const TAG_FILE: Tag = *b"FILE    ";
pub const TAG_FRAME_COUNT: Tag = *b"fCount  ";
pub const TAG_FRAME_RATE: Tag = *b"fRate   ";
pub const TAG_FRAME: Tag = *b"FRAME   ";
pub const TAG_FOCAL_LENGTH: Tag = *b"focalLen";
pub const TAG_OBJECTS: Tag = *b"OBJECTS ";
pub const TAG_OBJECT: Tag = *b"OBJECT  ";
pub const TAG_MATRIX: Tag = *b"MATRIX  ";
pub const TAG_STROKES: Tag = *b"STROKES ";
pub const TAG_STROKE: Tag = *b"STROKE  ";
pub const TAG_VERTEX_COUNT: Tag = *b"vertexCt";
pub const TAG_VERTICES: Tag = *b"VERTICES";
pub const TAG_DONE: Tag = *b"DONE    ";
pub const TAG_END: Tag = *b"END GPLA";

/// Base64 of the first six magic bytes; every wrapped snapshot starts with it
pub const BASE64_PREFIX: &str = "R1BMQSAg";

/// Bytes per encoded vertex
const VERTEX_LEN: usize = 3 * FIELD_LEN;

/// Container format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Version written by this encoder
    pub const CURRENT: Self = Self {
        major: 2,
        minor: 0,
        patch: 0,
    };

    /// Whether this decoder can read files of this version
    pub fn is_supported(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn tag_str(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Append-only buffer for one GPLA file
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn tag(&mut self, tag: &Tag) {
        self.buf.extend_from_slice(tag);
    }

    fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn header(&mut self, frame_count: u64, frame_rate: u64) {
        self.tag(&TAG_MAGIC);
        self.u64(Version::CURRENT.major);
        self.u64(Version::CURRENT.minor);
        self.u64(Version::CURRENT.patch);

        self.tag(&TAG_FILE);
        self.tag(&TAG_FRAME_COUNT);
        self.u64(frame_count);
        self.tag(&TAG_FRAME_RATE);
        self.u64(frame_rate);
        self.tag(&TAG_DONE);
    }

    fn frame(&mut self, frame: &Frame) {
        self.tag(&TAG_FRAME);
        self.tag(&TAG_FOCAL_LENGTH);
        self.f64(frame.focal_length);

        self.tag(&TAG_OBJECTS);
        for object in &frame.objects {
            self.object(object);
        }
        self.tag(&TAG_DONE);

        self.tag(&TAG_DONE);
    }

    fn object(&mut self, object: &CapturedObject) {
        self.tag(&TAG_OBJECT);

        self.tag(&TAG_MATRIX);
        for value in object.matrix.as_slice() {
            self.f64(*value);
        }
        self.tag(&TAG_DONE);

        self.tag(&TAG_STROKES);
        for stroke in &object.strokes {
            self.stroke(stroke);
        }
        self.tag(&TAG_DONE);

        self.tag(&TAG_DONE);
    }

    fn stroke(&mut self, stroke: &Stroke) {
        self.tag(&TAG_STROKE);
        self.tag(&TAG_VERTEX_COUNT);
        self.u64(stroke.len() as u64);

        self.tag(&TAG_VERTICES);
        for p in stroke {
            self.f64(p.x);
            self.f64(p.y);
            self.f64(p.z);
        }
        self.tag(&TAG_DONE);

        self.tag(&TAG_DONE);
    }

    fn finish(mut self) -> Vec<u8> {
        self.tag(&TAG_END);
        self.buf
    }
}

fn estimated_size(frames: &[Frame]) -> usize {
    let header = 16 * FIELD_LEN;
    let body: usize = frames
        .iter()
        .map(|f| {
            8 * FIELD_LEN
                + f.objects.len() * 24 * FIELD_LEN
                + f.stroke_count() * 5 * FIELD_LEN
                + f.point_count() * VERTEX_LEN
        })
        .sum();
    header + body
}

/// Encode a multi-frame recording
///
/// The whole file is built in memory so the header count always equals the
/// number of frame records. A recording needs at least one frame.
pub fn encode_recording(recording: &SceneRecording) -> Result<Vec<u8>> {
    if recording.frames.is_empty() {
        return Err(LinecastError::encode("a GPLA recording needs at least one frame"));
    }

    let mut writer = Writer::with_capacity(estimated_size(&recording.frames));
    writer.header(recording.frame_count(), recording.frame_rate);
    for frame in &recording.frames {
        writer.frame(frame);
    }
    let bytes = writer.finish();

    debug!(
        "Encoded GPLA recording: {} frames @ {} fps, {} bytes",
        recording.frame_count(),
        recording.frame_rate,
        bytes.len()
    );
    Ok(bytes)
}

/// Encode a single-frame snapshot
pub fn encode_snapshot(frame: &Frame, frame_rate: u64) -> Vec<u8> {
    let mut writer = Writer::with_capacity(estimated_size(std::slice::from_ref(frame)));
    writer.header(1, frame_rate);
    writer.frame(frame);
    let bytes = writer.finish();
    trace!("Encoded GPLA snapshot: {} bytes", bytes.len());
    bytes
}

/// Base64-wrap a snapshot and terminate it with `\n` for the socket
pub fn encode_snapshot_line(frame: &Frame, frame_rate: u64) -> Vec<u8> {
    let mut line = STANDARD.encode(encode_snapshot(frame, frame_rate)).into_bytes();
    line.push(b'\n');
    line
}

/// Base64 text container for a whole file
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Cursor over untrusted GPLA bytes
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(LinecastError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn field(&mut self) -> Result<[u8; FIELD_LEN]> {
        let mut out = [0u8; FIELD_LEN];
        out.copy_from_slice(self.take(FIELD_LEN)?);
        Ok(out)
    }

    fn peek_tag(&self) -> Result<Tag> {
        if self.remaining() < FIELD_LEN {
            return Err(LinecastError::Truncated {
                offset: self.pos,
                needed: FIELD_LEN,
                available: self.remaining(),
            });
        }
        let mut out = [0u8; FIELD_LEN];
        out.copy_from_slice(&self.data[self.pos..self.pos + FIELD_LEN]);
        Ok(out)
    }

    fn expect(&mut self, tag: &Tag) -> Result<()> {
        let offset = self.pos;
        let found = self.field()?;
        if &found != tag {
            return Err(LinecastError::corrupt(offset, tag_str(tag), tag_str(&found)));
        }
        Ok(())
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.field()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.field()?))
    }

    fn version(&mut self) -> Result<Version> {
        self.expect(&TAG_MAGIC)?;
        let version = Version {
            major: self.u64()?,
            minor: self.u64()?,
            patch: self.u64()?,
        };
        if !version.is_supported() {
            return Err(LinecastError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
                patch: version.patch,
            });
        }
        Ok(version)
    }

    /// Returns `(frame_count, frame_rate)`
    fn file_info(&mut self) -> Result<(u64, u64)> {
        self.expect(&TAG_FILE)?;
        self.expect(&TAG_FRAME_COUNT)?;
        let count = self.u64()?;
        self.expect(&TAG_FRAME_RATE)?;
        let rate = self.u64()?;
        self.expect(&TAG_DONE)?;
        Ok((count, rate))
    }

    fn frame(&mut self) -> Result<Frame> {
        self.expect(&TAG_FRAME)?;
        self.expect(&TAG_FOCAL_LENGTH)?;
        let focal_length = self.f64()?;

        self.expect(&TAG_OBJECTS)?;
        let mut objects = Vec::new();
        while self.next_is(&TAG_OBJECT, &TAG_DONE)? {
            objects.push(self.object()?);
        }
        self.expect(&TAG_DONE)?;

        self.expect(&TAG_DONE)?;
        Ok(Frame::new(focal_length, objects))
    }

    fn object(&mut self) -> Result<CapturedObject> {
        self.expect(&TAG_OBJECT)?;

        self.expect(&TAG_MATRIX)?;
        let mut m = [0.0; 16];
        for value in m.iter_mut() {
            *value = self.f64()?;
        }
        self.expect(&TAG_DONE)?;

        self.expect(&TAG_STROKES)?;
        let mut strokes = Vec::new();
        while self.next_is(&TAG_STROKE, &TAG_DONE)? {
            strokes.push(self.stroke()?);
        }
        self.expect(&TAG_DONE)?;

        self.expect(&TAG_DONE)?;
        Ok(CapturedObject::new(String::new(), Matrix4(m), strokes))
    }

    fn stroke(&mut self) -> Result<Stroke> {
        self.expect(&TAG_STROKE)?;
        self.expect(&TAG_VERTEX_COUNT)?;
        let count_offset = self.pos;
        let count = self.u64()?;

        self.expect(&TAG_VERTICES)?;
        // never size anything from the declared count before checking it
        let needed = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(VERTEX_LEN))
            .filter(|n| *n <= self.remaining())
            .ok_or(LinecastError::Truncated {
                offset: count_offset,
                needed: usize::try_from(count)
                    .unwrap_or(usize::MAX)
                    .saturating_mul(VERTEX_LEN),
                available: self.remaining(),
            })?;

        let raw = self.take(needed)?;
        let points = raw
            .chunks_exact(VERTEX_LEN)
            .map(|v| {
                let coord = |i: usize| {
                    let mut b = [0u8; FIELD_LEN];
                    b.copy_from_slice(&v[i * FIELD_LEN..(i + 1) * FIELD_LEN]);
                    f64::from_le_bytes(b)
                };
                Vec3::new(coord(0), coord(1), coord(2))
            })
            .collect();
        self.expect(&TAG_DONE)?;

        self.expect(&TAG_DONE)?;
        Ok(points)
    }

    /// True if the next tag is `item`, false if it is `done`, error otherwise
    fn next_is(&self, item: &Tag, done: &Tag) -> Result<bool> {
        let tag = self.peek_tag()?;
        if &tag == item {
            Ok(true)
        } else if &tag == done {
            Ok(false)
        } else {
            Err(LinecastError::corrupt(
                self.pos,
                format!("{} or {}", tag_str(item), tag_str(done)),
                tag_str(&tag),
            ))
        }
    }
}

/// Decode a raw binary GPLA file
pub fn decode_recording(data: &[u8]) -> Result<SceneRecording> {
    let mut reader = Reader::new(data);
    let version = reader.version()?;
    let (declared, frame_rate) = reader.file_info()?;

    let mut frames = Vec::new();
    loop {
        // Frame+ : the first record must be a frame
        if frames.is_empty() {
            let tag = reader.peek_tag()?;
            if tag != TAG_FRAME {
                return Err(LinecastError::corrupt(reader.pos, tag_str(&TAG_FRAME), tag_str(&tag)));
            }
        }
        if !reader.next_is(&TAG_FRAME, &TAG_END)? {
            break;
        }
        frames.push(reader.frame()?);
    }
    reader.expect(&TAG_END)?;

    if reader.remaining() > 0 {
        return Err(LinecastError::corrupt(
            reader.pos,
            "end of data",
            format!("{} trailing bytes", reader.remaining()),
        ));
    }

    let actual = frames.len() as u64;
    if declared != actual {
        return Err(LinecastError::FrameCountMismatch { declared, actual });
    }

    debug!(
        "Decoded GPLA {} recording: {} frames @ {} fps",
        version, actual, frame_rate
    );
    Ok(SceneRecording::new(frame_rate, frames))
}

/// Decode a single-frame snapshot
pub fn decode_snapshot(data: &[u8]) -> Result<Frame> {
    let recording = decode_recording(data)?;
    let count = recording.frames.len();
    let mut frames = recording.frames;
    match (count, frames.pop()) {
        (1, Some(frame)) => Ok(frame),
        _ => Err(LinecastError::corrupt(
            0,
            "single-frame snapshot",
            format!("{} frames", count),
        )),
    }
}

/// Decode a base64-wrapped snapshot line as sent on the socket
pub fn decode_snapshot_line(line: &[u8]) -> Result<Frame> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let bytes = STANDARD
        .decode(line)
        .map_err(|e| LinecastError::corrupt(0, "base64 GPLA snapshot", e.to_string()))?;
    decode_snapshot(&bytes)
}

/// Decode a `.gpla` file: raw binary, base64 text or a JSON frames document
pub fn decode_file_bytes(data: &[u8]) -> Result<SceneRecording> {
    if data.starts_with(&TAG_MAGIC) {
        return decode_recording(data);
    }

    let trimmed = data.trim_ascii_start();
    if trimmed.starts_with(b"{") {
        debug!("Reading JSON frames document");
        return json::decode_frames_document(trimmed);
    }

    let text: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(&text).map_err(|e| {
        LinecastError::corrupt(0, "GPLA binary or base64 text", format!("undecodable ({})", e))
    })?;
    decode_recording(&bytes)
}
