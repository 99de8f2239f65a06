//! Headless GPU context that records calls instead of issuing them.

use std::collections::HashSet;

use cgmath::Matrix4;

use super::{
    AttribLocations, BufferId, BufferTarget, DrawMode, GpuContext, ShaderId, TextureId,
    VertexAttrib,
};
use crate::gfx::resources::texture_resource::TextureImage;

/// One recorded GPU operation
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateBuffer { id: BufferId, target: BufferTarget, bytes: usize },
    DeleteBuffer(BufferId),
    BindBuffer(BufferTarget, BufferId),
    CreateTexture { id: TextureId, width: u32, height: u32 },
    BindTexture(TextureId),
    CreateProgram(ShaderId),
    UseProgram(ShaderId),
    UniformMat4(String, Matrix4<f32>),
    UniformVec3(String, [f32; 3]),
    UniformVec4(String, [f32; 4]),
    UniformF32(String, f32),
    UniformI32(String, i32),
    AttribPointer { attrib: VertexAttrib, components: u32, stride: u32, offset: u32 },
    EnableAttrib(VertexAttrib),
    DisableAttrib(VertexAttrib),
    DrawIndexed { mode: DrawMode, count: u32 },
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    Clear,
}

/// [`GpuContext`] that keeps a log of every call.
///
/// Handles are allocated from a single counter so buffer, texture and program
/// ids never collide, which keeps assertions unambiguous.
#[derive(Debug, Default)]
pub struct RecordingContext {
    pub calls: Vec<GpuCall>,
    next_id: u32,
    live_buffers: HashSet<BufferId>,
    context_lost: bool,
    reject_programs: bool,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Forgets recorded calls but keeps allocated handles alive
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Simulates losing the context
    pub fn set_context_lost(&mut self, lost: bool) {
        self.context_lost = lost;
    }

    /// Makes every subsequent `create_program` fail
    pub fn set_reject_programs(&mut self, reject: bool) {
        self.reject_programs = reject;
    }

    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }

    pub fn is_buffer_live(&self, buffer: BufferId) -> bool {
        self.live_buffers.contains(&buffer)
    }

    /// All recorded draws, in order
    pub fn draws(&self) -> Vec<(DrawMode, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GpuCall::DrawIndexed { mode, count } => Some((*mode, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.draws().len()
    }

    /// Textures bound immediately before each draw
    pub fn textures_drawn(&self) -> Vec<Option<TextureId>> {
        let mut bound = None;
        let mut drawn = Vec::new();
        for call in &self.calls {
            match call {
                GpuCall::BindTexture(id) => bound = Some(*id),
                GpuCall::DrawIndexed { .. } => drawn.push(bound),
                _ => {}
            }
        }
        drawn
    }

    /// Programs in use at each draw
    pub fn programs_drawn(&self) -> Vec<Option<ShaderId>> {
        let mut current = None;
        let mut drawn = Vec::new();
        for call in &self.calls {
            match call {
                GpuCall::UseProgram(id) => current = Some(*id),
                GpuCall::DrawIndexed { .. } => drawn.push(current),
                _ => {}
            }
        }
        drawn
    }

    /// Values of a named mat4 uniform, in upload order
    pub fn mat4_uniforms(&self, name: &str) -> Vec<Matrix4<f32>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GpuCall::UniformMat4(n, m) if n == name => Some(*m),
                _ => None,
            })
            .collect()
    }

    /// Values of a named vec3 uniform, in upload order
    pub fn vec3_uniforms(&self, name: &str) -> Vec<[f32; 3]> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GpuCall::UniformVec3(n, v) if n == name => Some(*v),
                _ => None,
            })
            .collect()
    }
}

impl GpuContext for RecordingContext {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferId {
        let id = BufferId(self.allocate());
        self.live_buffers.insert(id);
        self.calls.push(GpuCall::CreateBuffer {
            id,
            target,
            bytes: data.len(),
        });
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.live_buffers.remove(&buffer);
        self.calls.push(GpuCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        self.calls.push(GpuCall::BindBuffer(target, buffer));
    }

    fn create_texture(&mut self, image: &TextureImage) -> TextureId {
        let id = TextureId(self.allocate());
        self.calls.push(GpuCall::CreateTexture {
            id,
            width: image.width,
            height: image.height,
        });
        id
    }

    fn bind_texture(&mut self, texture: TextureId) {
        self.calls.push(GpuCall::BindTexture(texture));
    }

    fn create_program(
        &mut self,
        _vertex_source: &str,
        _fragment_source: &str,
        _attribs: &AttribLocations,
    ) -> std::result::Result<ShaderId, String> {
        if self.reject_programs {
            return Err("program rejected by recording context".to_string());
        }
        let id = ShaderId(self.allocate());
        self.calls.push(GpuCall::CreateProgram(id));
        Ok(id)
    }

    fn use_program(&mut self, program: ShaderId) {
        self.calls.push(GpuCall::UseProgram(program));
    }

    fn set_uniform_mat4(&mut self, name: &str, value: &Matrix4<f32>) {
        self.calls.push(GpuCall::UniformMat4(name.to_string(), *value));
    }

    fn set_uniform_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.calls.push(GpuCall::UniformVec3(name.to_string(), value));
    }

    fn set_uniform_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.calls.push(GpuCall::UniformVec4(name.to_string(), value));
    }

    fn set_uniform_f32(&mut self, name: &str, value: f32) {
        self.calls.push(GpuCall::UniformF32(name.to_string(), value));
    }

    fn set_uniform_i32(&mut self, name: &str, value: i32) {
        self.calls.push(GpuCall::UniformI32(name.to_string(), value));
    }

    fn vertex_attrib_pointer(&mut self, attrib: VertexAttrib, components: u32, stride: u32, offset: u32) {
        self.calls.push(GpuCall::AttribPointer {
            attrib,
            components,
            stride,
            offset,
        });
    }

    fn enable_attrib(&mut self, attrib: VertexAttrib) {
        self.calls.push(GpuCall::EnableAttrib(attrib));
    }

    fn disable_attrib(&mut self, attrib: VertexAttrib) {
        self.calls.push(GpuCall::DisableAttrib(attrib));
    }

    fn draw_indexed(&mut self, mode: DrawMode, count: u32) {
        self.calls.push(GpuCall::DrawIndexed { mode, count });
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(GpuCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear(&mut self) {
        self.calls.push(GpuCall::Clear);
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }
}
