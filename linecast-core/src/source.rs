//! Geometry source contract
//!
//! The host editor is reached only through this trait. Implementations
//! answer for "the current frame" and must enumerate objects in the same
//! order on every call for identical scene state; that order is the only
//! ordering guarantee objects receive on the wire.

use crate::types::{Matrix4, Stroke};

/// An object as the host reports it, in world space
#[derive(Debug, Clone, PartialEq)]
pub struct SourceObject {
    /// Object name
    pub name: String,
    /// World transform
    pub world: Matrix4,
    /// Strokes, verbatim from the host
    pub strokes: Vec<Stroke>,
}

impl SourceObject {
    /// Create a new source object
    pub fn new(name: impl Into<String>, world: Matrix4, strokes: Vec<Stroke>) -> Self {
        Self {
            name: name.into(),
            world,
            strokes,
        }
    }
}

/// The active scene camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraInfo {
    /// World transform
    pub world: Matrix4,
    /// Lens focal length in millimeters
    pub lens_mm: f64,
}

/// Read access to the host scene graph
pub trait GeometrySource {
    /// Visible drawable objects for the current frame, in a stable order
    fn current_frame_objects(&self) -> Vec<SourceObject>;

    /// The designated camera, if any
    fn camera(&self) -> Option<CameraInfo>;

    /// Move the host timeline to `frame`
    fn advance_to_frame(&mut self, frame: i64);

    /// Inclusive first and last frame of the timeline
    fn frame_range(&self) -> (i64, i64);

    /// Timeline rate in frames per second
    fn frame_rate(&self) -> u64;
}
