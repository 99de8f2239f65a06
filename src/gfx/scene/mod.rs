//! # Scene Management Module
//!
//! Drawables, their hierarchy and the per-frame render dispatch.
//!
//! ## Key Components
//!
//! - [`Scene`] - Owns the GPU context, the top-level object list, the
//!   optional scene graph and the label-keyed resource tables
//! - [`Drawable`] - A positioned shape with render attributes, behaviours and
//!   optional children
//! - [`Component`] - Non-rendering wrapper whose matrix its drawable inherits
//! - [`Face`] - Prepared face of a multi-face shape with resolved attributes
//!
//! ## Usage
//!
//! ```no_run
//! use carnival::gfx::gpu::RecordingContext;
//! use carnival::gfx::geometry::SimpleCuboid;
//! use carnival::gfx::scene::{Drawable, Scene, LEFT_EYE};
//! use cgmath::{Matrix4, SquareMatrix, Vector3};
//!
//! let mut scene = Scene::new(RecordingContext::new());
//! scene.add_object(
//!     Drawable::new(SimpleCuboid::new(1.0, 1.0, 1.0), Vector3::new(0.0, 1.0, -2.0))
//!         .with_texture_label("silver")
//!         .with_shader_label("basic"),
//! );
//! scene.advance_simulation(scene.now());
//! let stats = scene.render(&Matrix4::identity(), &Matrix4::identity(), LEFT_EYE);
//! ```
//!
//! ## Frame Flow
//!
//! 1. [`Scene::advance_simulation`] installs loaded assets and runs behaviours
//! 2. [`Scene::render`] is called once per eye or view; it walks the scene
//!    graph, then every top-level object, resolving textures and shaders
//!    through their fallback chains
//!
//! [`Scene::render_views`] does both for a list of [`Viewport`]s.

pub mod container;
pub mod drawable;
pub mod face;
pub mod render;
pub mod scene;
pub mod spatial;

// Re-export main types
pub use container::{Component, ObjectId, SceneObject};
pub use drawable::{
    make_easing_function, Animation, Behaviour, BehaviourContext, Drawable, FaceSpec,
    InteractionHandler, Metadata, RenderAttributes, Scale, ScratchPad, ScratchValue,
    TemporaryGeometry, TextureLoader, TimingFunction,
};
pub use face::{Face, GeometryBuffers, MeshBuffers};
pub use render::{RenderStats, Viewport, LEFT_EYE, RIGHT_EYE};
pub use scene::{ObjectDistance, Scene, RAFT_LABEL};
pub use spatial::{PlayerSpatialState, WorldPose};
