//! Prepared GPU state: interleaved geometry buffers, mesh buffers and faces.
//!
//! Face attributes are resolved once, when the owning drawable is prepared.
//! Only label lookups are deferred to render time.

use crate::gfx::geometry::FlatGeometry;
use crate::gfx::gpu::{upload_floats, upload_indices, BufferId, GpuContext};
use crate::gfx::mesh::Mesh;

use super::drawable::{FaceSpec, RenderAttributes};

/// Interleaved vertex buffer plus index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBuffers {
    pub vertex: BufferId,
    pub index: BufferId,
    pub index_count: u32,
}

impl GeometryBuffers {
    pub fn upload<G: GpuContext + ?Sized>(gpu: &mut G, geometry: &FlatGeometry) -> Self {
        Self {
            index: upload_indices(gpu, &geometry.indices),
            vertex: upload_floats(gpu, &geometry.vertices),
            index_count: geometry.indices.len() as u32,
        }
    }

    pub fn delete<G: GpuContext + ?Sized>(&self, gpu: &mut G) {
        gpu.delete_buffer(self.vertex);
        gpu.delete_buffer(self.index);
    }
}

/// Planar buffers uploaded from a [`Mesh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    pub normal: BufferId,
    pub tex_coord: BufferId,
    pub vertex: BufferId,
    pub index: BufferId,
    /// Number of texcoord pairs; zero when the mesh has none
    pub tex_coord_count: u32,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn upload<G: GpuContext + ?Sized>(gpu: &mut G, mesh: &Mesh) -> Self {
        Self {
            normal: upload_floats(gpu, &mesh.normals),
            tex_coord: upload_floats(gpu, &mesh.tex_coords),
            vertex: upload_floats(gpu, &mesh.vertices),
            index: upload_indices(gpu, &mesh.indices),
            tex_coord_count: (mesh.tex_coords.len() / 2) as u32,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn delete<G: GpuContext + ?Sized>(&self, gpu: &mut G) {
        gpu.delete_buffer(self.vertex);
        gpu.delete_buffer(self.index);
        gpu.delete_buffer(self.tex_coord);
        gpu.delete_buffer(self.normal);
    }
}

/// A prepared face of a multi-face shape
#[derive(Debug, Clone)]
pub struct Face {
    pub name: String,
    pub buffers: GeometryBuffers,
    pub attributes: RenderAttributes,
    pub no_texture: bool,
}

impl Face {
    /// Resolves each attribute as authored face, else parent.
    ///
    /// A `no_texture` face loses every texture source so that nothing
    /// registered later can make it drawable again.
    pub fn resolve(
        name: &str,
        buffers: GeometryBuffers,
        authored: Option<&FaceSpec>,
        parent: &RenderAttributes,
    ) -> Self {
        let no_texture = authored.is_some_and(|spec| spec.no_texture);
        let mut attributes = match authored {
            Some(spec) => spec.attributes.or(parent),
            None => parent.or(&RenderAttributes::default()),
        };
        if no_texture {
            attributes.texture = None;
            attributes.texture_label = None;
            attributes.left_eye_texture = None;
            attributes.right_eye_texture = None;
            attributes.texture_loader = None;
        }
        Self {
            name: name.to_string(),
            buffers,
            attributes,
            no_texture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::gpu::{RecordingContext, TextureId};
    use std::rc::Rc;

    fn buffers() -> GeometryBuffers {
        GeometryBuffers {
            vertex: BufferId(1),
            index: BufferId(2),
            index_count: 6,
        }
    }

    #[test]
    fn test_face_inherits_from_parent() {
        let parent = RenderAttributes {
            texture_label: Some("silver".to_string()),
            shader_label: Some("basic".to_string()),
            ..Default::default()
        };
        let spec = FaceSpec::new().with_texture_label("gold");
        let face = Face::resolve("front", buffers(), Some(&spec), &parent);
        assert_eq!(face.attributes.texture_label.as_deref(), Some("gold"));
        assert_eq!(face.attributes.shader_label.as_deref(), Some("basic"));

        let bare = Face::resolve("other", buffers(), None, &parent);
        assert_eq!(bare.attributes.texture_label.as_deref(), Some("silver"));
        assert!(!bare.no_texture);
    }

    #[test]
    fn test_no_texture_blocks_inheritance() {
        let parent = RenderAttributes {
            texture: Some(TextureId(7)),
            texture_label: Some("silver".to_string()),
            texture_loader: Some(Rc::new(|| crate::gfx::resources::TextureImage::solid([0; 4]))),
            ..Default::default()
        };
        let face = Face::resolve("caption", buffers(), Some(&FaceSpec::untextured()), &parent);
        assert!(face.no_texture);
        assert_eq!(face.attributes.texture, None);
        assert_eq!(face.attributes.texture_label, None);
        assert!(face.attributes.texture_loader.is_none());
    }

    #[test]
    fn test_mesh_buffers_record_texcoord_presence() {
        let mut gpu = RecordingContext::new();
        let mesh = Mesh::new(vec![0.0; 9], Vec::new(), vec![0.0; 9], vec![0, 1, 2]);
        let buffers = MeshBuffers::upload(&mut gpu, &mesh);
        assert_eq!(buffers.tex_coord_count, 0);
        assert_eq!(buffers.index_count, 3);
        assert_eq!(gpu.live_buffer_count(), 4);
        buffers.delete(&mut gpu);
        assert_eq!(gpu.live_buffer_count(), 0);
    }
}
