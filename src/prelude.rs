//! # Carnival Prelude
//!
//! Commonly used types in one import:
//!
//! ```rust
//! use carnival::prelude::*;
//! ```
//!
//! which is enough to write:
//!
//! ```no_run
//! use carnival::prelude::*;
//! use cgmath::{Matrix4, SquareMatrix, Vector3};
//!
//! let mut scene = Scene::new(RecordingContext::new());
//! scene.add_object(
//!     Drawable::new(SimpleCuboid::new(0.5, 0.5, 0.5), Vector3::new(0.0, 1.2, -1.0))
//!         .with_texture_label("moccasin")
//!         .with_shader_label("basic"),
//! );
//! let stats = scene.render(&Matrix4::identity(), &Matrix4::identity(), LEFT_EYE);
//! ```

// Core scene types
pub use crate::config::SceneConfig;
pub use crate::error::{Result, SceneError};
pub use crate::gfx::scene::{
    Behaviour, BehaviourContext, Component, Drawable, FaceSpec, ObjectId, RenderStats, Scene,
    SceneObject, Viewport, LEFT_EYE, RIGHT_EYE,
};
pub use crate::time::{Clock, ManualClock, SystemClock, TimePoint};

// GPU seam
pub use crate::gfx::gpu::{DrawMode, GpuContext, RecordingContext, ShaderId, TextureId};

// Shapes and meshes
pub use crate::gfx::geometry::{
    BoardCuboid, ControllerShape, CylinderShape, GroundedCuboid, LatheExtruderShape, LatheShape,
    MeshShape, Shape, SimpleCuboid, StlShape, WallShape,
};
pub use crate::gfx::mesh::Mesh;

// Resources and loading
pub use crate::gfx::resources::{
    AssetFetcher, ColorSpec, FileFetcher, Light, Material, MemoryFetcher, Prerequisites,
    TextureImage,
};

// Input and boards
pub use crate::boards::{make_image_board, ImageBoard};
pub use crate::input::{make_gamepad_tracker, DeviceSource, Pose, SharedDevices, StageParameters, TrackedDevice};
