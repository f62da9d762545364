//! Frame model builder
//!
//! Turns the host's "now" into one [`Frame`]: camera-relative matrices,
//! strokes copied verbatim, and the focal length derived from the lens.

use tracing::debug;

use crate::camera::CameraSpace;
use crate::config::DEFAULT_FOCAL_SCALE;
use crate::error::{LinecastError, Result};
use crate::source::GeometrySource;
use crate::types::{CapturedObject, Frame};

/// Builds frames from a geometry source
#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder {
    focal_scale: f64,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_FOCAL_SCALE)
    }
}

impl FrameBuilder {
    /// Create a builder with the given lens-to-focal-length factor
    pub fn new(focal_scale: f64) -> Self {
        Self { focal_scale }
    }

    /// Lens-to-focal-length factor
    pub fn focal_scale(&self) -> f64 {
        self.focal_scale
    }

    /// Focal length for a lens in millimeters
    pub fn focal_length(&self, lens_mm: f64) -> f64 {
        self.focal_scale * lens_mm
    }

    /// Capture the current frame
    ///
    /// Fails without producing anything if there is no camera or the camera
    /// cannot be inverted. Objects without strokes are kept.
    pub fn build(&self, source: &dyn GeometrySource) -> Result<Frame> {
        let camera = source.camera().ok_or(LinecastError::NoCamera)?;
        let space = CameraSpace::new(&camera.world)?;

        let objects: Vec<CapturedObject> = source
            .current_frame_objects()
            .into_iter()
            .map(|o| CapturedObject::new(o.name, space.relative(&o.world), o.strokes))
            .collect();

        let frame = Frame::new(self.focal_length(camera.lens_mm), objects);
        debug!(
            "Captured frame: {} objects, {} strokes, focal length {}",
            frame.objects.len(),
            frame.stroke_count(),
            frame.focal_length
        );
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ScriptedScene;
    use crate::types::{Matrix4, Vec3};

    #[test]
    fn test_focal_length_from_lens() {
        assert_eq!(FrameBuilder::default().focal_length(50.0), -2.5);
        assert_eq!(FrameBuilder::new(-0.1).focal_length(50.0), -5.0);
    }

    #[test]
    fn test_build_keeps_empty_objects() {
        let scene = ScriptedScene::new(24)
            .with_object("Line01", Matrix4::IDENTITY, vec![vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]])
            .with_object("Marker", Matrix4::translation(0.0, 1.0, 0.0), vec![]);

        let frame = FrameBuilder::default().build(&scene).unwrap();
        assert_eq!(frame.focal_length, -2.5);
        assert_eq!(frame.objects.len(), 2);
        assert_eq!(frame.objects[0].name, "Line01");
        assert_eq!(frame.objects[0].strokes[0][1], Vec3::new(1.0, 0.0, 0.0));
        assert!(frame.objects[1].strokes.is_empty());
        assert_eq!(frame.objects[1].matrix, Matrix4::translation(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_build_applies_camera_space() {
        let scene = ScriptedScene::new(24)
            .with_camera(Matrix4::translation(0.0, 0.0, 5.0), 50.0)
            .with_object("a", Matrix4::IDENTITY, vec![]);
        let frame = FrameBuilder::default().build(&scene).unwrap();
        assert!(frame.objects[0]
            .matrix
            .approx_eq(&Matrix4::translation(0.0, 0.0, -5.0), 1e-12));
    }

    #[test]
    fn test_build_without_camera_fails() {
        let scene = ScriptedScene::new(24).without_camera();
        assert!(matches!(
            FrameBuilder::default().build(&scene),
            Err(LinecastError::NoCamera)
        ));
    }
}
