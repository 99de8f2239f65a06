//! Error types for the scene framework
//!
//! Only setup-time operations (asset loading, shader compilation, mesh parsing)
//! return errors. The render path absorbs missing resources and stale poses
//! locally and never fails.

use std::io;
use thiserror::Error;

/// Errors raised while building or feeding a [`Scene`](crate::gfx::scene::Scene).
#[derive(Error, Debug)]
pub enum SceneError {
    /// IO error when reading a local asset
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// An asset fetch through an [`AssetFetcher`](crate::gfx::resources::AssetFetcher) failed
    #[error("failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// Encoded image bytes could not be decoded
    #[error("image decoding error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// OBJ parsing error
    #[error("OBJ loading error: {0}")]
    ObjLoad(#[from] tobj::LoadError),

    /// ASCII STL source contained no usable facets
    #[error("STL parsing error: {0}")]
    StlParse(String),

    /// Mesh URL has an extension no loader understands
    #[error("unsupported mesh format: {0}")]
    UnsupportedMesh(String),

    /// A colour string was not `#rrggbb` or `#rrggbbaa`
    #[error("invalid colour '{0}'")]
    InvalidColor(String),

    /// Shader compilation or linking failed
    #[error("shader '{label}' failed to build: {log}")]
    ShaderBuild { label: String, log: String },

    /// Asset source was not valid UTF-8 text
    #[error("asset '{0}' is not valid UTF-8")]
    NotText(String),

    /// The GPU context went away mid-session
    #[error("GPU context lost")]
    ContextLost,

    /// The scene that should receive a loaded asset has been dropped
    #[error("asset channel closed before '{0}' could be delivered")]
    ChannelClosed(String),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SceneError>;
