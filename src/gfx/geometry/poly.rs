//! Triangle accumulator used by every procedural shape.

use super::FlatGeometry;

/// A position in model space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vert {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vert {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Common texture coordinates (v grows downward)
pub mod tex {
    pub const TL: [f32; 2] = [0.0, 0.0];
    pub const BL: [f32; 2] = [0.0, 1.0];
    pub const TR: [f32; 2] = [1.0, 0.0];
    pub const BR: [f32; 2] = [1.0, 1.0];
    /// Placeholder for untextured triangles
    pub const NO: [f32; 2] = [0.0, 0.0];
}

/// Accumulates triangles into interleaved vertex and index arrays.
///
/// Every triangle gets three fresh vertices carrying the current face normal
/// and the current translation offset.
#[derive(Debug, Clone, Default)]
pub struct Poly {
    verts: Vec<f32>,
    indices: Vec<u32>,
    face_normal: [f32; 3],
    offset: [f32; 3],
}

impl Poly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset applied to every vertex added after this call
    pub fn with_offset(mut self, x: f32, y: f32, z: f32) -> Self {
        self.offset = [x, y, z];
        self
    }

    /// Sets the normal used for subsequent triangles
    pub fn normal(&mut self, x: f32, y: f32, z: f32) {
        self.face_normal = [x, y, z];
    }

    pub fn add(
        &mut self,
        v1: Vert,
        t1: [f32; 2],
        v2: Vert,
        t2: [f32; 2],
        v3: Vert,
        t3: [f32; 2],
    ) {
        let base = (self.verts.len() / super::VERTEX_FLOATS) as u32;
        for (v, t) in [(v1, t1), (v2, t2), (v3, t3)] {
            self.push_vertex(v, t);
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    fn push_vertex(&mut self, v: Vert, t: [f32; 2]) {
        let [nx, ny, nz] = self.face_normal;
        let [ox, oy, oz] = self.offset;
        self.verts
            .extend_from_slice(&[v.x + ox, v.y + oy, v.z + oz, t[0], t[1], nx, ny, nz]);
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn divulge(self) -> FlatGeometry {
        FlatGeometry::new(self.verts, self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_interleaves_and_indexes() {
        let mut poly = Poly::new().with_offset(1.0, 0.0, 0.0);
        poly.normal(0.0, 0.0, 1.0);
        let a = Vert::new(0.0, 0.0, 0.0);
        poly.add(a, tex::TL, a, tex::BL, a, tex::TR);
        poly.add(a, tex::BL, a, tex::BR, a, tex::TR);

        let flat = poly.divulge();
        assert_eq!(flat.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(flat.vertex_count(), 6);
        assert_eq!(flat.position(4), [1.0, 0.0, 0.0]);
        assert_eq!(flat.tex_coord(4), tex::BR);
        assert_eq!(flat.normal(5), [0.0, 0.0, 1.0]);
    }
}
