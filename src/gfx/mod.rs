//! # Graphics Module
//!
//! Everything between a scene description and the GPU: shapes and their
//! geometry, meshes, label-keyed resources, the scene itself and the thin
//! context trait the scene draws through.
//!
//! ## Architecture Overview
//!
//! - **GPU seam** ([`gpu`]) - [`GpuContext`](gpu::GpuContext) trait with a
//!   recording implementation for headless use
//! - **Geometry** ([`geometry`]) - Shapes that divulge interleaved vertex data,
//!   optionally split into named faces
//! - **Meshes** ([`mesh`]) - Planar vertex/texcoord/normal/index arrays loaded
//!   from OBJ or STL
//! - **Resources** ([`resources`]) - Textures, shaders, materials and lights,
//!   plus asynchronous asset loading
//! - **Scene** ([`scene`]) - Drawables, hierarchy, behaviours and render
//!   dispatch
//!
//! ## Usage
//!
//! ```no_run
//! use carnival::gfx::{gpu::RecordingContext, scene::Scene};
//!
//! let mut scene = Scene::new(RecordingContext::new());
//! scene.setup_default_scene().unwrap();
//! ```

pub mod geometry;
pub mod gpu;
pub mod math;
pub mod mesh;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use gpu::GpuContext;
pub use scene::Scene;
