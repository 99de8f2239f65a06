//! Scene configuration
//!
//! Tunables that the render path reads every frame. Defaults match the
//! behaviour existing content is calibrated against.

/// Configuration for a [`Scene`](crate::gfx::scene::Scene)
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Minimum spacing between lazy texture materialisations, in milliseconds
    pub texture_load_interval_ms: f64,
    /// Global debug cap on the number of indices drawn per mesh
    pub mesh_index_limit: Option<u32>,
    /// Shader label used when neither the node nor its material names one
    pub default_shader_label: Option<String>,
    /// Shader label used for one-shot temporary geometry
    pub temporary_geometry_shader_label: String,
    /// Texture label used for one-shot temporary geometry
    pub temporary_geometry_texture_label: String,
    /// Number of light uniform slots filled by `bind_lights_to_shader`
    pub max_light_slots: usize,
    /// Eye height assumed when the display reports no stage parameters
    pub player_height: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            texture_load_interval_ms: 100.0,
            mesh_index_limit: None,
            default_shader_label: None,
            temporary_geometry_shader_label: "basic".to_string(),
            temporary_geometry_texture_label: "cyan".to_string(),
            max_light_slots: 7,
            player_height: 1.82,
        }
    }
}

impl SceneConfig {
    /// Builder pattern: Set texture load pacing
    pub fn with_texture_load_interval(mut self, interval_ms: f64) -> Self {
        self.texture_load_interval_ms = interval_ms.max(0.0);
        self
    }

    /// Builder pattern: Cap mesh index counts (debugging aid)
    pub fn with_mesh_index_limit(mut self, limit: u32) -> Self {
        self.mesh_index_limit = Some(limit);
        self
    }

    /// Builder pattern: Set the scene default shader label
    pub fn with_default_shader(mut self, label: &str) -> Self {
        self.default_shader_label = Some(label.to_string());
        self
    }

    /// Builder pattern: Set shader and texture used for temporary geometry
    pub fn with_temporary_geometry_style(mut self, shader_label: &str, texture_label: &str) -> Self {
        self.temporary_geometry_shader_label = shader_label.to_string();
        self.temporary_geometry_texture_label = texture_label.to_string();
        self
    }

    /// Builder pattern: Set number of light slots
    pub fn with_light_slots(mut self, slots: usize) -> Self {
        self.max_light_slots = slots;
        self
    }

    /// Builder pattern: Set seated eye height
    pub fn with_player_height(mut self, height: f32) -> Self {
        self.player_height = height;
        self
    }
}
