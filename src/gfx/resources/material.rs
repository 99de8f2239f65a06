//! Material and light definitions
//!
//! Materials carry the Phong terms pushed as `material.*` uniforms before a
//! draw, plus optional texture and shader references that take part in the
//! render-state fallback chains. Materials are registered on the scene by
//! label and referenced from drawables or faces either directly or by label.

use crate::gfx::gpu::{GpuContext, ShaderId, TextureId};

/// Phong material with optional texture and shader references
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub texture: Option<TextureId>,
    pub texture_label: Option<String>,
    pub shader: Option<ShaderId>,
    pub shader_label: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: [0.0, 0.0, 0.0],
            diffuse: [0.0, 0.0, 0.0],
            specular: [0.0, 0.0, 0.0],
            shininess: 0.0,
            texture: None,
            texture_label: None,
            shader: None,
            shader_label: None,
        }
    }
}

impl Material {
    /// Creates a material from its lighting terms
    ///
    /// # Arguments
    /// * `ambient` - RGB ambient reflectance
    /// * `diffuse` - RGB diffuse reflectance
    /// * `specular` - RGB specular reflectance
    pub fn new(ambient: [f32; 3], diffuse: [f32; 3], specular: [f32; 3]) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            ..Default::default()
        }
    }

    /// Builder pattern: Set specular exponent
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess.max(0.0);
        self
    }

    /// Builder pattern: Reference an uploaded texture
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Builder pattern: Reference a texture by label
    pub fn with_texture_label(mut self, label: &str) -> Self {
        self.texture_label = Some(label.to_string());
        self
    }

    /// Builder pattern: Reference a compiled shader
    pub fn with_shader(mut self, shader: ShaderId) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Builder pattern: Reference a shader by label
    pub fn with_shader_label(mut self, label: &str) -> Self {
        self.shader_label = Some(label.to_string());
        self
    }

    /// Pushes the lighting terms to the program in use
    pub fn bind<G: GpuContext + ?Sized>(&self, gpu: &mut G) {
        gpu.set_uniform_vec3("material.Ambient", self.ambient);
        gpu.set_uniform_vec3("material.Diffuse", self.diffuse);
        gpu.set_uniform_vec3("material.Specular", self.specular);
        gpu.set_uniform_f32("material.Shininess", self.shininess);
    }

    /// Uniforms every freshly compiled shader starts with
    pub fn shader_default() -> Self {
        Self::new([1.0, 1.0, 1.0], [0.8, 0.8, 0.8], [1.0, 1.0, 1.0])
    }
}

/// Point or directional light bound into the `lights[]` uniform array
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Light {
    /// w = 0 for directional lights
    pub position: [f32; 4],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

impl Light {
    pub fn new(position: [f32; 4]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder pattern: Set all three colour terms
    pub fn with_colors(mut self, ambient: [f32; 3], diffuse: [f32; 3], specular: [f32; 3]) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    /// Writes this light into `lights[slot]` of the program in use
    pub fn bind<G: GpuContext + ?Sized>(&self, gpu: &mut G, slot: usize) {
        let base = format!("lights[{}].", slot);
        gpu.set_uniform_vec4(&format!("{}Position", base), self.position);
        gpu.set_uniform_vec3(&format!("{}Ambient", base), self.ambient);
        gpu.set_uniform_vec3(&format!("{}Diffuse", base), self.diffuse);
        gpu.set_uniform_vec3(&format!("{}Specular", base), self.specular);
    }
}

/// Binds `lights` into slots `1..` of `shader`, zeroing unused slots.
///
/// Slot 0 is never written; shaders index their lights from 1. At least
/// `slots` slots are written, more if there are more lights.
pub fn bind_lights<G: GpuContext + ?Sized>(gpu: &mut G, shader: ShaderId, lights: &[Light], slots: usize) {
    gpu.use_program(shader);
    let null_light = Light::default();
    for i in 0..lights.len().max(slots) {
        lights.get(i).unwrap_or(&null_light).bind(gpu, i + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::gpu::{GpuCall, RecordingContext};

    #[test]
    fn test_material_builder() {
        let material = Material::new([0.1; 3], [0.5; 3], [1.0; 3])
            .with_shininess(-3.0)
            .with_texture_label("brick")
            .with_shader_label("ads");
        assert_eq!(material.shininess, 0.0);
        assert_eq!(material.texture_label.as_deref(), Some("brick"));
        assert_eq!(material.shader, None);
    }

    #[test]
    fn test_material_uniform_names() {
        let mut gpu = RecordingContext::new();
        Material::shader_default().bind(&mut gpu);
        assert_eq!(gpu.vec3_uniforms("material.Diffuse"), vec![[0.8, 0.8, 0.8]]);
        assert!(gpu
            .calls
            .contains(&GpuCall::UniformF32("material.Shininess".to_string(), 0.0)));
    }

    #[test]
    fn test_bind_lights_skips_slot_zero() {
        let mut gpu = RecordingContext::new();
        let sun = Light::new([0.0, 10.0, 0.0, 0.0]).with_colors([0.2; 3], [0.9; 3], [1.0; 3]);
        bind_lights(&mut gpu, ShaderId(9), &[sun], 7);

        assert_eq!(gpu.calls[0], GpuCall::UseProgram(ShaderId(9)));
        assert_eq!(gpu.vec3_uniforms("lights[1].Diffuse"), vec![[0.9; 3]]);
        assert_eq!(gpu.vec3_uniforms("lights[7].Diffuse"), vec![[0.0; 3]]);
        assert!(gpu.vec3_uniforms("lights[0].Diffuse").is_empty());
        assert!(gpu.vec3_uniforms("lights[8].Diffuse").is_empty());
    }
}
