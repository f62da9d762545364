//! Line-JSON frame encoding
//!
//! One JSON document per frame, terminated by `\n`:
//!
//! ```text
//! {"objects":[{"name":"Line01","vertices":[[{"x":0.0,"y":0.0,"z":0.0},...]],"matrix":[16 values]}],"focalLength":-2.5}
//! ```
//!
//! Three schema revisions exist:
//! - `path-vertices-v0` sends every stroke as one flat `pathVertices` list,
//!   each stroke terminated by a point whose components are the bare token
//!   `NaN` (not valid JSON, but what early consumers parse)
//! - `mesh-v1` sends a flat vertex list plus an edge index list the first
//!   time an object is seen on a connection, and only `name` + `matrix`
//!   afterwards
//! - `strokes-v2` always sends every stroke as an array of point arrays
//!
//! Whole recordings can also be stored as one JSON document,
//! `{"frames":[...],"frameRate":24}`, the oldest `.gpla` shape.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use tracing::trace;

use crate::cache::ObjectCache;
use crate::error::{LinecastError, Result};
use crate::types::{CapturedObject, Frame, Matrix4, SceneRecording, Stroke, Vec3};

/// Frame rate assumed for JSON documents that do not declare one
pub const DEFAULT_DOCUMENT_FRAME_RATE: u64 = 24;

/// Object payload layout on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum JsonSchema {
    /// NaN-separated flat path, geometry sent every frame
    PathVerticesV0,
    /// Flat vertices + edges, geometry sent once per connection
    MeshV1,
    /// Array of stroke arrays, geometry sent every frame
    #[default]
    StrokesV2,
}

impl JsonSchema {
    /// Whether this schema relies on the incremental cache
    pub fn is_incremental(&self) -> bool {
        matches!(self, Self::MeshV1)
    }
}

impl std::fmt::Display for JsonSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathVerticesV0 => write!(f, "path-vertices-v0"),
            Self::MeshV1 => write!(f, "mesh-v1"),
            Self::StrokesV2 => write!(f, "strokes-v2"),
        }
    }
}

impl std::str::FromStr for JsonSchema {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path-vertices-v0" | "path" | "v0" => Ok(Self::PathVerticesV0),
            "mesh-v1" | "mesh" | "v1" => Ok(Self::MeshV1),
            "strokes-v2" | "strokes" | "v2" => Ok(Self::StrokesV2),
            _ => Err(format!("Unknown JSON schema: {}", s)),
        }
    }
}

/// One frame as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMessage {
    pub objects: Vec<ObjectMessage>,
    #[serde(rename = "focalLength")]
    pub focal_length: f64,
}

/// Per-object payload, one variant per schema shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectMessage {
    /// `strokes-v2`
    Strokes(StrokesObject),
    /// `mesh-v1`, first sighting
    Mesh(MeshObject),
    /// `path-vertices-v0`
    Path(PathObject),
    /// `mesh-v1`, geometry already delivered
    Transform(TransformObject),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrokesObject {
    pub name: String,
    pub vertices: Vec<Stroke>,
    pub matrix: Matrix4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshObject {
    pub name: String,
    pub vertices: Vec<Vec3>,
    /// Flat index pairs into `vertices`
    pub edges: Vec<u64>,
    pub matrix: Matrix4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathObject {
    pub name: String,
    /// Every stroke's points, each stroke followed by a NaN point
    #[serde(rename = "pathVertices")]
    pub path_vertices: Vec<PathPoint>,
    pub matrix: Matrix4,
}

/// Point of a `pathVertices` list; `NaN` (or `null`) components read as NaN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    #[serde(deserialize_with = "nan_or_f64")]
    pub x: f64,
    #[serde(deserialize_with = "nan_or_f64")]
    pub y: f64,
    #[serde(deserialize_with = "nan_or_f64")]
    pub z: f64,
}

impl PathPoint {
    /// Stroke terminator
    pub const SEPARATOR: Self = Self {
        x: f64::NAN,
        y: f64::NAN,
        z: f64::NAN,
    };

    /// Whether this point ends a stroke
    pub fn is_separator(&self) -> bool {
        self.x.is_nan() && self.y.is_nan() && self.z.is_nan()
    }
}

impl From<Vec3> for PathPoint {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

fn nan_or_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformObject {
    pub name: String,
    pub matrix: Matrix4,
}

impl ObjectMessage {
    /// Object name
    pub fn name(&self) -> &str {
        match self {
            Self::Strokes(o) => &o.name,
            Self::Mesh(o) => &o.name,
            Self::Path(o) => &o.name,
            Self::Transform(o) => &o.name,
        }
    }

    /// Camera-relative matrix
    pub fn matrix(&self) -> &Matrix4 {
        match self {
            Self::Strokes(o) => &o.matrix,
            Self::Mesh(o) => &o.matrix,
            Self::Path(o) => &o.matrix,
            Self::Transform(o) => &o.matrix,
        }
    }

    /// Whether this payload carries geometry
    pub fn has_geometry(&self) -> bool {
        !matches!(self, Self::Transform(_))
    }
}

impl FrameMessage {
    /// Rebuild a frame; mesh edges become two-point strokes and
    /// transform-only objects have no strokes
    pub fn into_frame(self) -> Frame {
        let objects = self
            .objects
            .into_iter()
            .map(|o| match o {
                ObjectMessage::Strokes(s) => CapturedObject::new(s.name, s.matrix, s.vertices),
                ObjectMessage::Mesh(m) => {
                    let strokes = m
                        .edges
                        .chunks_exact(2)
                        .filter_map(|pair| {
                            let a = m.vertices.get(pair[0] as usize)?;
                            let b = m.vertices.get(pair[1] as usize)?;
                            Some(vec![*a, *b])
                        })
                        .collect();
                    CapturedObject::new(m.name, m.matrix, strokes)
                }
                ObjectMessage::Path(p) => {
                    CapturedObject::new(p.name, p.matrix, split_path(&p.path_vertices))
                }
                ObjectMessage::Transform(t) => CapturedObject::new(t.name, t.matrix, Vec::new()),
            })
            .collect();
        Frame::new(self.focal_length, objects)
    }
}

/// Encoded line plus the names it committed to the cache
#[derive(Debug, Clone)]
pub struct EncodedLine {
    /// JSON document followed by `\n`
    pub bytes: Vec<u8>,
    /// Names marked sent by this encode; roll these back if the send fails
    pub committed: Vec<String>,
}

fn mesh_object(object: &CapturedObject) -> MeshObject {
    let mut vertices = Vec::with_capacity(object.point_count());
    let mut edges = Vec::new();

    for stroke in &object.strokes {
        let base = vertices.len() as u64;
        vertices.extend_from_slice(stroke);
        for i in 1..stroke.len() as u64 {
            edges.push(base + i - 1);
            edges.push(base + i);
        }
    }

    MeshObject {
        name: object.name.clone(),
        vertices,
        edges,
        matrix: object.matrix,
    }
}

fn path_object(object: &CapturedObject) -> PathObject {
    let mut path_vertices = Vec::with_capacity(object.point_count() + object.strokes.len());
    for stroke in &object.strokes {
        path_vertices.extend(stroke.iter().copied().map(PathPoint::from));
        path_vertices.push(PathPoint::SEPARATOR);
    }
    PathObject {
        name: object.name.clone(),
        path_vertices,
        matrix: object.matrix,
    }
}

/// Cut a NaN-separated path back into strokes
///
/// Consecutive separators give empty strokes; points after the last
/// separator form a final unterminated stroke.
pub fn split_path(points: &[PathPoint]) -> Vec<Stroke> {
    let mut strokes = Vec::new();
    let mut current = Vec::new();
    for point in points {
        if point.is_separator() {
            strokes.push(std::mem::take(&mut current));
        } else {
            current.push(Vec3::new(point.x, point.y, point.z));
        }
    }
    if !current.is_empty() {
        strokes.push(current);
    }
    strokes
}

/// Real points must be finite: NaN is reserved for the path separator and
/// the other schemas cannot represent it at all
fn check_finite(frame: &Frame) -> Result<()> {
    if !frame.focal_length.is_finite() {
        return Err(LinecastError::encode(format!(
            "focal length {} is not finite",
            frame.focal_length
        )));
    }
    for object in &frame.objects {
        if !object.matrix.is_finite() {
            return Err(LinecastError::encode(format!(
                "object {:?} has a non-finite matrix",
                object.name
            )));
        }
        if !object.strokes.iter().flatten().all(Vec3::is_finite) {
            return Err(LinecastError::encode(format!(
                "object {:?} has non-finite points",
                object.name
            )));
        }
    }
    Ok(())
}

/// Build the wire message for `frame`
///
/// With `mesh-v1`, names that get full geometry are marked in `cache` and
/// returned so the caller can roll them back on a failed send.
pub fn frame_message(
    frame: &Frame,
    schema: JsonSchema,
    cache: &mut ObjectCache,
) -> Result<(FrameMessage, Vec<String>)> {
    check_finite(frame)?;

    let mut committed = Vec::new();
    let objects = frame
        .objects
        .iter()
        .map(|object| match schema {
            JsonSchema::PathVerticesV0 => ObjectMessage::Path(path_object(object)),
            JsonSchema::StrokesV2 => ObjectMessage::Strokes(StrokesObject {
                name: object.name.clone(),
                vertices: object.strokes.clone(),
                matrix: object.matrix,
            }),
            JsonSchema::MeshV1 => {
                if cache.mark_sent(&object.name) {
                    committed.push(object.name.clone());
                    ObjectMessage::Mesh(mesh_object(object))
                } else {
                    ObjectMessage::Transform(TransformObject {
                        name: object.name.clone(),
                        matrix: object.matrix,
                    })
                }
            }
        })
        .collect();

    Ok((
        FrameMessage {
            objects,
            focal_length: frame.focal_length,
        },
        committed,
    ))
}

/// Encode `frame` as one newline-terminated JSON document
pub fn encode_line(frame: &Frame, schema: JsonSchema, cache: &mut ObjectCache) -> Result<EncodedLine> {
    let (message, committed) = frame_message(frame, schema, cache)?;

    let mut bytes = match to_json_bytes(&message, schema) {
        Ok(bytes) => bytes,
        Err(e) => {
            cache.rollback(&committed);
            return Err(e.into());
        }
    };
    bytes.push(b'\n');

    trace!("Encoded {} byte JSON line ({})", bytes.len(), schema);
    Ok(EncodedLine { bytes, committed })
}

/// Writes NaN as the bare `NaN` token of the path schema
///
/// serde_json routes non-finite floats to `write_null`; frame messages have
/// no optional fields, so every null written is a NaN.
struct NanFormatter;

impl serde_json::ser::Formatter for NanFormatter {
    fn write_null<W>(&mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        writer.write_all(b"NaN")
    }
}

fn to_json_bytes(message: &FrameMessage, schema: JsonSchema) -> serde_json::Result<Vec<u8>> {
    match schema {
        JsonSchema::PathVerticesV0 => {
            let mut out = Vec::new();
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, NanFormatter);
            message.serialize(&mut serializer)?;
            Ok(out)
        }
        JsonSchema::MeshV1 | JsonSchema::StrokesV2 => serde_json::to_vec(message),
    }
}

/// Rewrite bare `NaN` tokens outside string literals as `null`
fn nan_tokens_to_null(text: &[u8]) -> Cow<'_, [u8]> {
    if !text.windows(3).any(|w| w == b"NaN") {
        return Cow::Borrowed(text);
    }

    let mut out = Vec::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < text.len() {
        let b = text[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if text[i..].starts_with(b"NaN") {
            out.extend_from_slice(b"null");
            i += 3;
            continue;
        }
        out.push(b);
        i += 1;
    }
    Cow::Owned(out)
}

/// Parse one line back into a typed message
pub fn decode_line(line: &[u8]) -> Result<FrameMessage> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    Ok(serde_json::from_slice(&nan_tokens_to_null(line))?)
}

/// Multi-frame JSON recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesDocument {
    pub frames: Vec<FrameMessage>,
    /// Absent in the oldest files
    #[serde(rename = "frameRate", default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u64>,
}

/// Encode a whole recording as one JSON document (strokes-v2 objects)
pub fn encode_frames_document(recording: &SceneRecording) -> Result<Vec<u8>> {
    if recording.frames.is_empty() {
        return Err(LinecastError::encode("a recording needs at least one frame"));
    }

    // strokes-v2 never touches the cache
    let mut cache = ObjectCache::new();
    let frames = recording
        .frames
        .iter()
        .map(|frame| frame_message(frame, JsonSchema::StrokesV2, &mut cache).map(|(m, _)| m))
        .collect::<Result<Vec<_>>>()?;

    let document = FramesDocument {
        frames,
        frame_rate: Some(recording.frame_rate),
    };
    Ok(serde_json::to_vec(&document)?)
}

/// Decode a JSON frames document; any object schema may appear
pub fn decode_frames_document(data: &[u8]) -> Result<SceneRecording> {
    let document: FramesDocument = serde_json::from_slice(&nan_tokens_to_null(data))?;
    if document.frames.is_empty() {
        return Err(LinecastError::corrupt(0, "at least one frame", "empty frames array"));
    }

    let frames = document.frames.into_iter().map(FrameMessage::into_frame).collect();
    Ok(SceneRecording::new(
        document.frame_rate.unwrap_or(DEFAULT_DOCUMENT_FRAME_RATE),
        frames,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line01() -> Frame {
        Frame::new(
            -2.5,
            vec![CapturedObject::new(
                "Line01",
                Matrix4::IDENTITY,
                vec![vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]],
            )],
        )
    }

    #[test]
    fn test_strokes_line_shape() {
        let mut cache = ObjectCache::new();
        let line = encode_line(&line01(), JsonSchema::StrokesV2, &mut cache).unwrap();

        assert_eq!(line.bytes.last(), Some(&b'\n'));
        assert_eq!(line.bytes.iter().filter(|b| **b == b'\n').count(), 1);
        assert!(line.committed.is_empty());
        assert!(cache.is_empty());

        let text = std::str::from_utf8(&line.bytes).unwrap();
        assert!(text.starts_with(r#"{"objects":[{"name":"Line01","vertices":[[{"x":0.0"#));
        assert!(text.trim_end().ends_with(r#""focalLength":-2.5}"#));
    }

    #[test]
    fn test_mesh_sends_geometry_once() {
        let mut cache = ObjectCache::new();
        let first = encode_line(&line01(), JsonSchema::MeshV1, &mut cache).unwrap();
        assert_eq!(first.committed, vec!["Line01".to_string()]);

        let msg = decode_line(&first.bytes).unwrap();
        match &msg.objects[0] {
            ObjectMessage::Mesh(m) => {
                assert_eq!(m.vertices.len(), 2);
                assert_eq!(m.edges, vec![0, 1]);
            }
            other => panic!("expected mesh payload, got {:?}", other),
        }

        let second = encode_line(&line01(), JsonSchema::MeshV1, &mut cache).unwrap();
        assert!(second.committed.is_empty());
        let msg = decode_line(&second.bytes).unwrap();
        assert!(matches!(msg.objects[0], ObjectMessage::Transform(_)));
    }

    #[test]
    fn test_mesh_edges_do_not_cross_strokes() {
        let object = CapturedObject::new(
            "two",
            Matrix4::IDENTITY,
            vec![
                vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)],
                vec![Vec3::new(5.0, 5.0, 5.0)],
                vec![Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)],
            ],
        );
        let mesh = mesh_object(&object);
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.edges, vec![0, 1, 1, 2, 4, 5]);
    }

    #[test]
    fn test_non_finite_rejected_without_touching_cache() {
        let mut frame = line01();
        frame.objects[0].strokes[0][0].x = f64::NAN;
        let mut cache = ObjectCache::new();
        let err = encode_line(&frame, JsonSchema::MeshV1, &mut cache).unwrap_err();
        assert!(matches!(err, LinecastError::Encode(_)));
        assert!(cache.should_send_full_geometry("Line01"));
    }

    #[test]
    fn test_decode_roundtrip_strokes() {
        let mut cache = ObjectCache::new();
        let line = encode_line(&line01(), JsonSchema::StrokesV2, &mut cache).unwrap();
        assert_eq!(decode_line(&line.bytes).unwrap().into_frame(), line01());
    }

    #[test]
    fn test_schema_parse() {
        assert_eq!("mesh-v1".parse::<JsonSchema>(), Ok(JsonSchema::MeshV1));
        assert_eq!("V2".parse::<JsonSchema>(), Ok(JsonSchema::StrokesV2));
        assert!("v3".parse::<JsonSchema>().is_err());
        assert_eq!(JsonSchema::default().to_string(), "strokes-v2");
        assert_eq!("path".parse::<JsonSchema>(), Ok(JsonSchema::PathVerticesV0));
        assert_eq!(JsonSchema::PathVerticesV0.to_string(), "path-vertices-v0");
    }

    fn two_strokes_and_an_empty_one() -> Frame {
        Frame::new(
            -1.0,
            vec![CapturedObject::new(
                "NaN \"quoted\" NaN",
                Matrix4::translation(0.0, 0.0, -5.0),
                vec![
                    vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
                    vec![],
                    vec![Vec3::new(2.0, 2.0, 2.0)],
                ],
            )],
        )
    }

    #[test]
    fn test_path_line_uses_bare_nan_separators() {
        let mut cache = ObjectCache::new();
        let line =
            encode_line(&two_strokes_and_an_empty_one(), JsonSchema::PathVerticesV0, &mut cache).unwrap();
        assert!(cache.is_empty());

        let text = std::str::from_utf8(&line.bytes).unwrap();
        assert!(text.contains(r#""pathVertices":[{"x":0.0"#));
        assert!(text.contains(r#"{"x":NaN,"y":NaN,"z":NaN}"#));
        assert!(!text.contains("null"));
        assert_eq!(text.matches(r#"{"x":NaN"#).count(), 3);
    }

    #[test]
    fn test_path_line_splits_back_into_strokes() {
        let frame = two_strokes_and_an_empty_one();
        let mut cache = ObjectCache::new();
        let line = encode_line(&frame, JsonSchema::PathVerticesV0, &mut cache).unwrap();

        let decoded = decode_line(&line.bytes).unwrap();
        assert_eq!(decoded.objects[0].name(), "NaN \"quoted\" NaN");
        assert_eq!(decoded.into_frame(), frame);
    }

    #[test]
    fn test_path_line_from_external_writer() {
        let text = br#"{"objects":[{"name":"wave","pathVertices":[{"x":0,"y":1,"z":0},{"x":NaN,"y":NaN,"z":NaN},{"x":3,"y":4,"z":5}],"matrix":[1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1]}],"focalLength":-2}"#;
        let frame = decode_line(text).unwrap().into_frame();
        assert_eq!(
            frame.objects[0].strokes,
            vec![vec![Vec3::new(0.0, 1.0, 0.0)], vec![Vec3::new(3.0, 4.0, 5.0)]]
        );
    }

    #[test]
    fn test_split_path_edges() {
        let p = |x: f64| PathPoint { x, y: 0.0, z: 0.0 };
        assert!(split_path(&[]).is_empty());
        assert_eq!(split_path(&[PathPoint::SEPARATOR]), vec![Vec::<Vec3>::new()]);
        assert_eq!(split_path(&[p(1.0), p(2.0)]).len(), 1);

        // a single NaN component is not a separator
        let partial = PathPoint { x: f64::NAN, y: 0.0, z: 0.0 };
        assert!(!partial.is_separator());
    }

    #[test]
    fn test_nan_rewrite_skips_string_contents() {
        let text = br#"{"a":"NaN\\","b":NaN}"#;
        assert_eq!(&*nan_tokens_to_null(text), br#"{"a":"NaN\\","b":null}"#);
        assert!(matches!(nan_tokens_to_null(b"{}"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_frames_document_roundtrip_keeps_names() {
        let recording = SceneRecording::new(12, vec![line01(), two_strokes_and_an_empty_one()]);
        let bytes = encode_frames_document(&recording).unwrap();
        assert!(bytes.starts_with(br#"{"frames":[{"objects":"#));

        assert_eq!(decode_frames_document(&bytes).unwrap(), recording);
    }

    #[test]
    fn test_frames_document_defaults() {
        let text = br#"{"frames":[{"objects":[],"focalLength":-2.5}]}"#;
        let recording = decode_frames_document(text).unwrap();
        assert_eq!(recording.frame_rate, DEFAULT_DOCUMENT_FRAME_RATE);
        assert_eq!(recording.frames, vec![Frame::new(-2.5, vec![])]);

        assert!(decode_frames_document(br#"{"frames":[]}"#).is_err());
        assert!(encode_frames_document(&SceneRecording::new(24, vec![])).is_err());
    }
}
