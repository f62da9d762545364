//! Mock infrastructure for testing
//!
//! Provides a scripted geometry source and sample frames.

#![allow(dead_code)]

use linecast_core::source::{CameraInfo, GeometrySource, SourceObject};
use linecast_core::types::{CapturedObject, Frame, Matrix4, Vec3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The two-point `Line01` stroke used across tests
pub fn line01_stroke() -> Vec<Vec3> {
    vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]
}

/// Geometry source whose objects slide along +x by one unit per frame
pub struct MockSource {
    /// Objects at frame 0
    pub objects: Vec<SourceObject>,
    /// Camera (None = no camera designated)
    pub camera: Option<CameraInfo>,
    /// Current frame
    pub frame: i64,
    /// Inclusive timeline bounds
    pub range: (i64, i64),
    /// Frames per second
    pub rate: u64,
    /// Camera disappears on this frame
    pub lose_camera_at: Option<i64>,
    /// Flag raised when the timeline reaches `trip_at`
    pub trip: Option<(i64, Arc<AtomicBool>)>,
    /// Number of `advance_to_frame` calls
    pub advances: usize,
}

impl MockSource {
    /// Scene with `Line01` at the origin, identity camera, 50 mm lens
    pub fn line01() -> Self {
        Self {
            objects: vec![SourceObject::new("Line01", Matrix4::IDENTITY, vec![line01_stroke()])],
            camera: Some(CameraInfo {
                world: Matrix4::IDENTITY,
                lens_mm: 50.0,
            }),
            frame: 0,
            range: (0, 0),
            rate: 24,
            lose_camera_at: None,
            trip: None,
            advances: 0,
        }
    }

    /// Add an object
    pub fn with_object(mut self, name: &str, strokes: Vec<Vec<Vec3>>) -> Self {
        self.objects
            .push(SourceObject::new(name, Matrix4::translation(0.0, 2.0, 0.0), strokes));
        self
    }

    /// Set the timeline bounds
    pub fn with_range(mut self, start: i64, end: i64) -> Self {
        self.range = (start, end);
        self.frame = start;
        self
    }
}

impl GeometrySource for MockSource {
    fn current_frame_objects(&self) -> Vec<SourceObject> {
        self.objects
            .iter()
            .map(|o| {
                let mut world = o.world;
                world.0[3] += self.frame as f64;
                SourceObject::new(o.name.clone(), world, o.strokes.clone())
            })
            .collect()
    }

    fn camera(&self) -> Option<CameraInfo> {
        if self.lose_camera_at == Some(self.frame) {
            return None;
        }
        self.camera
    }

    fn advance_to_frame(&mut self, frame: i64) {
        self.frame = frame;
        self.advances += 1;
        if let Some((at, flag)) = &self.trip {
            if *at == frame {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }

    fn frame_range(&self) -> (i64, i64) {
        self.range
    }

    fn frame_rate(&self) -> u64 {
        self.rate
    }
}

/// A frame with a mix of populated and empty objects (no names, since GPLA
/// does not carry them)
pub fn sample_frame(seed: f64) -> Frame {
    Frame::new(
        -2.5 * seed,
        vec![
            CapturedObject::new(
                "",
                Matrix4::from_rows([
                    [0.5, 0.0, 0.0, seed],
                    [0.0, 0.5, 0.0, -seed],
                    [0.0, 0.0, 0.5, -10.0],
                    [0.0, 0.0, 0.0, 1.0],
                ]),
                vec![
                    vec![
                        Vec3::new(0.1, 0.2, 0.3),
                        Vec3::new(-1.5, 2.25, 1e-300),
                        Vec3::new(seed, seed * 2.0, seed * 3.0),
                    ],
                    vec![],
                    vec![Vec3::new(f64::MAX, f64::MIN_POSITIVE, -0.0)],
                ],
            ),
            CapturedObject::new("", Matrix4::IDENTITY, vec![]),
        ],
    )
}

/// Compare two JSON values, treating numbers by numeric value
pub fn assert_json_numeric_eq(actual: &serde_json::Value, expected: &serde_json::Value) {
    use serde_json::Value;
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            assert_eq!(a.as_f64(), b.as_f64(), "number mismatch: {} vs {}", a, b)
        }
        (Value::Array(a), Value::Array(b)) => {
            assert_eq!(a.len(), b.len(), "array length mismatch");
            for (x, y) in a.iter().zip(b) {
                assert_json_numeric_eq(x, y);
            }
        }
        (Value::Object(a), Value::Object(b)) => {
            assert_eq!(a.len(), b.len(), "key count mismatch");
            for (k, v) in b {
                let got = a.get(k).unwrap_or_else(|| panic!("missing key {}", k));
                assert_json_numeric_eq(got, v);
            }
        }
        (a, b) => assert_eq!(a, b),
    }
}
