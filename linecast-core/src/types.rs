//! Core types for Linecast
//!
//! These types represent one captured frame of a line-art scene: the
//! camera-relative transform of every object plus its strokes, and the
//! multi-frame recording that wraps them for export.

use serde::{Deserialize, Serialize};

/// A point in 3D space
///
/// NaN components are carried verbatim; only formats that define a meaning
/// for NaN interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create a new point
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Whether every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// 4x4 affine transform stored as 16 doubles in row-major order
///
/// Element `(row, col)` lives at index `row * 4 + col`, so the translation
/// of an object is at indices 3, 7 and 11.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix4(pub [f64; 16]);

impl Matrix4 {
    /// The identity transform
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Build from four rows
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        let mut m = [0.0; 16];
        for (r, row) in rows.iter().enumerate() {
            m[r * 4..r * 4 + 4].copy_from_slice(row);
        }
        Self(m)
    }

    /// A pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.0[3] = x;
        m.0[7] = y;
        m.0[11] = z;
        m
    }

    /// Element at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0[row * 4 + col]
    }

    /// The 16 values in row-major order
    pub fn as_slice(&self) -> &[f64; 16] {
        &self.0
    }

    /// Whether all 16 values are finite
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Compare element-wise within `tolerance`
    pub fn approx_eq(&self, other: &Matrix4, tolerance: f64) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Convert to glam (column-major)
    pub fn to_dmat4(&self) -> glam::DMat4 {
        glam::DMat4::from_cols_array(&self.0).transpose()
    }

    /// Convert from glam (column-major)
    pub fn from_dmat4(m: glam::DMat4) -> Self {
        Self(m.transpose().to_cols_array())
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One continuous drawn path; insertion order is drawing order
pub type Stroke = Vec<Vec3>;

/// Snapshot of a single drawable object for one frame
///
/// Built fresh every capture and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedObject {
    /// Object name, unique within its frame only
    pub name: String,
    /// Camera-relative transform
    pub matrix: Matrix4,
    /// Strokes in drawing order (may be empty)
    pub strokes: Vec<Stroke>,
}

impl CapturedObject {
    /// Create a new captured object
    pub fn new(name: impl Into<String>, matrix: Matrix4, strokes: Vec<Stroke>) -> Self {
        Self {
            name: name.into(),
            matrix,
            strokes,
        }
    }

    /// Total number of points across all strokes
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Vec::len).sum()
    }
}

/// One captured point on the host timeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Focal length as the consumer expects it (scaled lens value)
    pub focal_length: f64,
    /// Objects in source enumeration order
    pub objects: Vec<CapturedObject>,
}

impl Frame {
    /// Create a new frame
    pub fn new(focal_length: f64, objects: Vec<CapturedObject>) -> Self {
        Self {
            focal_length,
            objects,
        }
    }

    /// Total number of strokes in the frame
    pub fn stroke_count(&self) -> usize {
        self.objects.iter().map(|o| o.strokes.len()).sum()
    }

    /// Total number of points in the frame
    pub fn point_count(&self) -> usize {
        self.objects.iter().map(CapturedObject::point_count).sum()
    }
}

/// Multi-frame recording, the payload of a `.gpla` export
///
/// The frame count is always `frames.len()`; it is never stored separately.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneRecording {
    /// Playback rate in frames per second
    pub frame_rate: u64,
    /// Frames in timeline order
    pub frames: Vec<Frame>,
}

impl SceneRecording {
    /// Create a new recording
    pub fn new(frame_rate: u64, frames: Vec<Frame>) -> Self {
        Self { frame_rate, frames }
    }

    /// Number of frames
    pub fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    /// Duration in seconds at the recorded rate
    pub fn duration_secs(&self) -> f64 {
        if self.frame_rate == 0 {
            0.0
        } else {
            self.frames.len() as f64 / self.frame_rate as f64
        }
    }
}
