//! # GPU Context Seam
//!
//! The scene never talks to a graphics API directly. Everything it needs from
//! the GPU goes through [`GpuContext`], which mirrors the small slice of an
//! immediate-mode API the render dispatch uses: buffers, textures, programs,
//! named uniforms, attribute pointers and indexed draws.
//!
//! Uniform setters apply to the program most recently passed to
//! [`GpuContext::use_program`].
//!
//! [`recording::RecordingContext`] is a headless implementation that records
//! every call, used by the tests and the headless demo.

pub mod recording;

use cgmath::Matrix4;

use crate::gfx::resources::texture_resource::TextureImage;

pub use recording::{GpuCall, RecordingContext};

/// Opaque handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Opaque handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Opaque handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Vertex attribute data
    Array,
    /// Index data (u32)
    ElementArray,
}

/// Primitive topology for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Vertex attributes every scene shader is expected to declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttrib {
    Position,
    TexCoord,
    VertexNormal,
}

/// Attribute locations bound before a program is linked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribLocations {
    pub position: u32,
    pub tex_coord: u32,
    pub vertex_normal: u32,
}

impl Default for AttribLocations {
    fn default() -> Self {
        Self {
            position: 0,
            tex_coord: 1,
            vertex_normal: 2,
        }
    }
}

/// Immediate-mode GPU operations consumed by the scene.
///
/// Implementations wrap a concrete graphics API. All calls happen on the render
/// thread inside a frame callback.
pub trait GpuContext {
    /// Creates a buffer and uploads `data` into it
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferId;

    /// Frees a buffer. Deleting an unknown buffer is a no-op.
    fn delete_buffer(&mut self, buffer: BufferId);

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId);

    /// Creates a 2D RGBA texture with nearest filtering
    fn create_texture(&mut self, image: &TextureImage) -> TextureId;

    fn bind_texture(&mut self, texture: TextureId);

    /// Compiles and links a program.
    ///
    /// # Errors
    /// Returns the driver's info log when compilation or linking fails.
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        attribs: &AttribLocations,
    ) -> std::result::Result<ShaderId, String>;

    fn use_program(&mut self, program: ShaderId);

    fn set_uniform_mat4(&mut self, name: &str, value: &Matrix4<f32>);
    fn set_uniform_vec3(&mut self, name: &str, value: [f32; 3]);
    fn set_uniform_vec4(&mut self, name: &str, value: [f32; 4]);
    fn set_uniform_f32(&mut self, name: &str, value: f32);
    fn set_uniform_i32(&mut self, name: &str, value: i32);

    /// Describes float attribute data in the currently bound array buffer.
    /// `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer(&mut self, attrib: VertexAttrib, components: u32, stride: u32, offset: u32);
    fn enable_attrib(&mut self, attrib: VertexAttrib);
    fn disable_attrib(&mut self, attrib: VertexAttrib);

    /// Draws `count` u32 indices from the bound element buffer
    fn draw_indexed(&mut self, mode: DrawMode, count: u32);

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn clear(&mut self);

    /// Reports whether the underlying context has been lost
    fn is_context_lost(&self) -> bool {
        false
    }
}

/// Uploads interleaved or planar float data into a new array buffer
pub fn upload_floats<G: GpuContext + ?Sized>(gpu: &mut G, data: &[f32]) -> BufferId {
    gpu.create_buffer(BufferTarget::Array, bytemuck::cast_slice(data))
}

/// Uploads u32 indices into a new element buffer
pub fn upload_indices<G: GpuContext + ?Sized>(gpu: &mut G, indices: &[u32]) -> BufferId {
    gpu.create_buffer(BufferTarget::ElementArray, bytemuck::cast_slice(indices))
}
