//! # Procedural Geometry
//!
//! Shapes describe themselves by *divulging* raw geometry which the scene
//! uploads when an object is prepared. Geometry is either a single flat
//! vertex/index pair or a map of named faces, each with its own pair.
//!
//! ## Vertex Layout
//!
//! Flat geometry is interleaved, 8 floats (32 bytes) per vertex:
//!
//! | Attribute | Floats | Byte offset |
//! |-----------|--------|-------------|
//! | position  | 3      | 0           |
//! | texcoord  | 2      | 12          |
//! | normal    | 3      | 20          |
//!
//! ## Usage
//!
//! ```rust
//! use carnival::gfx::geometry::{Poly, Vert, tex};
//!
//! let mut poly = Poly::new();
//! poly.normal(0.0, 0.0, 1.0);
//! poly.add(
//!     Vert::new(0.0, 0.0, 0.0), tex::BL,
//!     Vert::new(1.0, 0.0, 0.0), tex::BR,
//!     Vert::new(1.0, 1.0, 0.0), tex::TR,
//! );
//! let flat = poly.divulge();
//! assert_eq!(flat.vertex_count(), 3);
//! ```

pub mod poly;
pub mod shapes;
pub mod stl;

use indexmap::IndexMap;

pub use poly::{tex, Poly, Vert};
pub use shapes::{
    BoardCuboid, ContainerShape, ControllerShape, CylinderShape, GroundedCuboid,
    LatheExtruderShape, LatheShape, MeshShape, ProfileSampler, SamplerKind, Shape, ShapeSampler,
    SimpleCuboid, StlShape, WallShape,
};
pub use stl::parse_stl_source;

/// Floats per interleaved vertex
pub const VERTEX_FLOATS: usize = 8;

/// Bytes per interleaved vertex
pub const VERTEX_STRIDE: u32 = (VERTEX_FLOATS * std::mem::size_of::<f32>()) as u32;

/// Byte offset of the texcoord attribute within a vertex
pub const TEXCOORD_OFFSET: u32 = 12;

/// Byte offset of the normal attribute within a vertex
pub const NORMAL_OFFSET: u32 = 20;

/// Interleaved vertices plus triangle indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatGeometry {
    /// position.xyz, texcoord.uv, normal.xyz per vertex
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl FlatGeometry {
    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_FLOATS
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, vertex: usize) -> [f32; 3] {
        let base = vertex * VERTEX_FLOATS;
        [self.vertices[base], self.vertices[base + 1], self.vertices[base + 2]]
    }

    pub fn tex_coord(&self, vertex: usize) -> [f32; 2] {
        let base = vertex * VERTEX_FLOATS + 3;
        [self.vertices[base], self.vertices[base + 1]]
    }

    pub fn normal(&self, vertex: usize) -> [f32; 3] {
        let base = vertex * VERTEX_FLOATS + 5;
        [self.vertices[base], self.vertices[base + 1], self.vertices[base + 2]]
    }

    /// Axis-aligned bounds of all positions, `None` when empty
    pub fn bounds(&self) -> Option<Bounds> {
        (0..self.vertex_count())
            .map(|i| self.position(i))
            .fold(None, |acc: Option<Bounds>, p| {
                Some(match acc {
                    None => Bounds { min: p, max: p },
                    Some(b) => b.including(p),
                })
            })
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    fn including(self, p: [f32; 3]) -> Self {
        Self {
            min: [self.min[0].min(p[0]), self.min[1].min(p[1]), self.min[2].min(p[2])],
            max: [self.max[0].max(p[0]), self.max[1].max(p[1]), self.max[2].max(p[2])],
        }
    }

    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// What a shape divulges at prepare time
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Geometry {
    /// Nothing to upload (containers, mesh-backed shapes)
    #[default]
    Empty,
    /// One vertex/index pair for the whole object
    Flat(FlatGeometry),
    /// Named faces, each addressable for its own texture/shader/material
    Faced(IndexMap<String, FlatGeometry>),
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        matches!(self, Geometry::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_matches_layout() {
        assert_eq!(VERTEX_STRIDE, 32);
        assert_eq!(NORMAL_OFFSET, TEXCOORD_OFFSET + 8);
    }

    #[test]
    fn test_bounds() {
        let mut poly = Poly::new();
        poly.normal(0.0, 1.0, 0.0);
        poly.add(
            Vert::new(-1.0, 0.0, 2.0),
            tex::TL,
            Vert::new(3.0, 0.5, -2.0),
            tex::BL,
            Vert::new(0.0, -4.0, 0.0),
            tex::TR,
        );
        let bounds = poly.divulge().bounds().unwrap();
        assert_eq!(bounds.min, [-1.0, -4.0, -2.0]);
        assert_eq!(bounds.max, [3.0, 0.5, 2.0]);
        assert_eq!(bounds.size(), [4.0, 4.5, 4.0]);
        assert!(FlatGeometry::default().bounds().is_none());
    }
}
