//! Linecast Core Library
//!
//! Captures a time-varying 3D line-art scene (camera + objects made of
//! strokes) and serializes each frame for a real-time consumer or into a
//! multi-frame `.gpla` recording.
//!
//! This library provides:
//! - Camera-space normalization of object transforms
//! - A line-JSON stream encoding with an incremental geometry cache
//! - The GPLA tag-chunked binary container (encoder and strict decoder)
//! - A session state machine owning the consumer connection
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌───────────────┐    ┌──────────────┐    ┌───────────────┐
//! │ GeometrySource  │───▶│ FrameBuilder  │───▶│ JSON / GPLA  │───▶│ Socket / File │
//! │ (host scene)    │    │ (camera space)│    │ encoder      │    │ (Session)     │
//! └─────────────────┘    └───────────────┘    └──────────────┘    └───────────────┘
//! ```

pub mod builder;
pub mod cache;
pub mod camera;
pub mod codec;
pub mod config;
pub mod error;
pub mod recording;
pub mod scene;
pub mod session;
pub mod source;
pub mod types;

pub use builder::FrameBuilder;
pub use cache::ObjectCache;
pub use codec::{JsonSchema, Message, Protocol};
pub use config::{ConfigFile, SessionConfig};
pub use error::{LinecastError, Result};
pub use recording::{ExportFormat, Recorder};
pub use scene::ScriptedScene;
pub use session::{SendOutcome, Session, SessionState, Trigger};
pub use source::{CameraInfo, GeometrySource, SourceObject};
pub use types::{CapturedObject, Frame, Matrix4, SceneRecording, Stroke, Vec3};
