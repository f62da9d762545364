//! World to camera space conversion
//!
//! Every object matrix sent to a consumer is `inverse(camera) * object`.

use tracing::trace;

use crate::error::{LinecastError, Result};
use crate::types::Matrix4;

/// Determinants at or below this magnitude are treated as singular
const SINGULAR_EPSILON: f64 = 1e-12;

/// Inverted camera transform, computed once per frame
#[derive(Debug, Clone, Copy)]
pub struct CameraSpace {
    inverse: glam::DMat4,
}

impl CameraSpace {
    /// Invert the camera world transform
    ///
    /// Fails on a non-invertible (or non-finite) camera instead of guessing.
    pub fn new(camera_world: &Matrix4) -> Result<Self> {
        let m = camera_world.to_dmat4();
        let det = m.determinant();

        if !det.is_finite() || det.abs() <= SINGULAR_EPSILON {
            return Err(LinecastError::DegenerateCamera(det));
        }

        trace!("Camera determinant {}", det);
        Ok(Self {
            inverse: m.inverse(),
        })
    }

    /// Express an object world transform relative to the camera
    pub fn relative(&self, object_world: &Matrix4) -> Matrix4 {
        Matrix4::from_dmat4(self.inverse * object_world.to_dmat4())
    }
}

/// One-shot `inverse(camera) * object`
pub fn camera_relative(camera_world: &Matrix4, object_world: &Matrix4) -> Result<Matrix4> {
    Ok(CameraSpace::new(camera_world)?.relative(object_world))
}
