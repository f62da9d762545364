//! File-backed scene
//!
//! A small JSON scene description that implements [`GeometrySource`], so the
//! capture pipeline can run without a host editor:
//!
//! ```json
//! {
//!   "frame_start": 1,
//!   "frame_end": 48,
//!   "frame_rate": 24,
//!   "camera": { "lens_mm": 50.0, "transforms": [[1,0,0,0, 0,1,0,0, 0,0,1,10, 0,0,0,1]] },
//!   "objects": [
//!     { "name": "Line01", "strokes": [[{"x":0,"y":0,"z":0},{"x":1,"y":0,"z":0}]] }
//!   ]
//! }
//! ```
//!
//! Transform lists are keyframes indexed from `frame_start`; frames past the
//! end of a list hold the last entry. An empty list means identity.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{LinecastError, Result};
use crate::source::{CameraInfo, GeometrySource, SourceObject};
use crate::types::{Matrix4, Stroke};

/// Camera track of a scripted scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedCamera {
    /// Lens focal length in millimeters
    #[serde(default = "default_lens")]
    pub lens_mm: f64,
    /// Per-frame world transforms
    #[serde(default)]
    pub transforms: Vec<Matrix4>,
}

/// Object track of a scripted scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedObject {
    pub name: String,
    /// Hidden objects are not enumerated
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
    /// Per-frame world transforms
    #[serde(default)]
    pub transforms: Vec<Matrix4>,
}

/// Scene loaded from a JSON description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedScene {
    #[serde(default = "default_frame_start")]
    pub frame_start: i64,
    #[serde(default = "default_frame_start")]
    pub frame_end: i64,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u64,
    #[serde(default)]
    pub camera: Option<ScriptedCamera>,
    #[serde(default)]
    pub objects: Vec<ScriptedObject>,
    #[serde(skip)]
    current: i64,
}

fn default_lens() -> f64 {
    50.0
}

fn default_true() -> bool {
    true
}

fn default_frame_start() -> i64 {
    1
}

fn default_frame_rate() -> u64 {
    24
}

fn keyframe(transforms: &[Matrix4], index: usize) -> Matrix4 {
    match transforms.get(index).or(transforms.last()) {
        Some(m) => *m,
        None => Matrix4::IDENTITY,
    }
}

impl ScriptedScene {
    /// Empty scene with an identity camera
    pub fn new(frame_rate: u64) -> Self {
        Self {
            frame_start: 1,
            frame_end: 1,
            frame_rate,
            camera: Some(ScriptedCamera {
                lens_mm: default_lens(),
                transforms: Vec::new(),
            }),
            objects: Vec::new(),
            current: 1,
        }
    }

    /// Parse a scene from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let mut scene: ScriptedScene = serde_json::from_str(text)?;
        if scene.frame_end < scene.frame_start {
            return Err(LinecastError::config(format!(
                "frame_end {} is before frame_start {}",
                scene.frame_end, scene.frame_start
            )));
        }
        scene.current = scene.frame_start;
        Ok(scene)
    }

    /// Load a scene from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LinecastError::config(format!("Failed to read scene {:?}: {}", path, e)))?;
        let scene = Self::from_json(&text)?;
        debug!(
            "Loaded scene {:?}: {} objects, frames {}..={}",
            path,
            scene.objects.len(),
            scene.frame_start,
            scene.frame_end
        );
        Ok(scene)
    }

    /// Add a static object
    pub fn with_object(mut self, name: impl Into<String>, world: Matrix4, strokes: Vec<Stroke>) -> Self {
        self.objects.push(ScriptedObject {
            name: name.into(),
            visible: true,
            strokes,
            transforms: vec![world],
        });
        self
    }

    /// Replace the camera
    pub fn with_camera(mut self, world: Matrix4, lens_mm: f64) -> Self {
        self.camera = Some(ScriptedCamera {
            lens_mm,
            transforms: vec![world],
        });
        self
    }

    /// Remove the camera
    pub fn without_camera(mut self) -> Self {
        self.camera = None;
        self
    }

    /// Set the inclusive frame range
    pub fn with_frame_range(mut self, start: i64, end: i64) -> Self {
        self.frame_start = start;
        self.frame_end = end.max(start);
        self.current = start;
        self
    }

    /// Frame the timeline currently sits on
    pub fn current_frame(&self) -> i64 {
        self.current
    }

    fn key_index(&self) -> usize {
        usize::try_from(self.current.saturating_sub(self.frame_start)).unwrap_or(0)
    }
}

impl GeometrySource for ScriptedScene {
    fn current_frame_objects(&self) -> Vec<SourceObject> {
        let index = self.key_index();
        self.objects
            .iter()
            .filter(|o| o.visible)
            .map(|o| SourceObject::new(o.name.clone(), keyframe(&o.transforms, index), o.strokes.clone()))
            .collect()
    }

    fn camera(&self) -> Option<CameraInfo> {
        self.camera.as_ref().map(|c| CameraInfo {
            world: keyframe(&c.transforms, self.key_index()),
            lens_mm: c.lens_mm,
        })
    }

    fn advance_to_frame(&mut self, frame: i64) {
        self.current = frame;
    }

    fn frame_range(&self) -> (i64, i64) {
        (self.frame_start, self.frame_end)
    }

    fn frame_rate(&self) -> u64 {
        self.frame_rate
    }
}
