// src/lib.rs
//! Carnival
//!
//! A scene framework for head-mounted displays: drawables arranged in a
//! transform hierarchy, rendered per eye through a thin GPU context trait.

pub mod boards;
pub mod config;
pub mod error;
pub mod gfx;
pub mod input;
pub mod prelude;
pub mod time;

// Re-export main types for convenience
pub use config::SceneConfig;
pub use error::{Result, SceneError};
pub use gfx::scene::Scene;
