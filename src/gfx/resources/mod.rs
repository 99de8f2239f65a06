// src/gfx/resources/mod.rs
//! Scene resources
//!
//! Textures, shaders, materials, meshes and model sources are registered on
//! the scene by label. Lookups of labels that have not been installed yet
//! simply return `None`; the render path treats that as "resource absent".

pub mod loader;
pub mod material;
pub mod texture_resource;

use std::collections::HashMap;
use std::rc::Rc;

use crate::gfx::gpu::{ShaderId, TextureId};
use crate::gfx::mesh::Mesh;

// Re-export main types
pub use loader::{
    asset_channel, AssetFetcher, AssetInbox, AssetSender, AssetSource, FetchFuture, FileFetcher,
    LoadFuture, LoadedAsset, MemoryFetcher, Prerequisites, ShaderSource,
};
pub use material::{bind_lights, Light, Material};
pub use texture_resource::{ColorSpec, TextureImage, BOARD_TEXTURE_SIZE};

/// Label-keyed resource tables owned by a scene
#[derive(Debug, Default)]
pub struct ResourceTables {
    pub textures: HashMap<String, TextureId>,
    pub shaders: HashMap<String, ShaderId>,
    pub materials: HashMap<String, Material>,
    pub meshes: HashMap<String, Rc<Mesh>>,
    pub model_sources: HashMap<String, String>,
}

impl ResourceTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, label: &str) -> Option<TextureId> {
        self.textures.get(label).copied()
    }

    pub fn shader(&self, label: &str) -> Option<ShaderId> {
        self.shaders.get(label).copied()
    }

    pub fn material(&self, label: &str) -> Option<&Material> {
        self.materials.get(label)
    }

    pub fn mesh(&self, label: &str) -> Option<Rc<Mesh>> {
        self.meshes.get(label).cloned()
    }

    pub fn model_source(&self, label: &str) -> Option<&str> {
        self.model_sources.get(label).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_labels_fail_soft() {
        let mut tables = ResourceTables::new();
        assert_eq!(tables.texture("cyan"), None);
        assert!(tables.material("brass").is_none());

        tables.textures.insert("cyan".to_string(), TextureId(3));
        tables.model_sources.insert("tri".to_string(), "solid tri".to_string());
        assert_eq!(tables.texture("cyan"), Some(TextureId(3)));
        assert_eq!(tables.model_source("tri"), Some("solid tri"));
        assert_eq!(tables.shader("cyan"), None);
    }
}
