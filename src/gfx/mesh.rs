//! # Meshes
//!
//! A [`Mesh`] keeps positions, texcoords and normals in separate flat arrays
//! with u32 indices. Meshes come from OBJ files (via `tobj`), from converted
//! shape geometry, or from hand-built arrays. The mesh tools here edit the
//! vertex data in place so models can be recentred or reoriented once at load
//! time instead of on every frame.

use std::io::BufRead;
use std::path::Path;

use cgmath::{InnerSpace, Rotation, Vector3};

use crate::error::Result;
use crate::gfx::geometry::{Bounds, FlatGeometry, VERTEX_FLOATS};
use crate::gfx::math::euler_quaternion;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// xyz per vertex
    pub vertices: Vec<f32>,
    /// uv per vertex, empty when the mesh is untextured
    pub tex_coords: Vec<f32>,
    /// xyz per vertex
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Result of [`Mesh::analyse`]
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAnalysis {
    pub bounds: Bounds,
    /// Uniform scale that fits the mesh into a 2.0 cube
    pub suggested_scale: f32,
    /// Puts the base on y = 0 and centres x and z
    pub suggested_translate: Vector3<f32>,
    /// `suggested_translate` after applying `suggested_scale`
    pub suggested_scaled_translate: Vector3<f32>,
    pub normal_lengths: Vec<f32>,
}

const FIT_IN_DIMENSION: f32 = 2.0;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

impl Mesh {
    pub fn new(vertices: Vec<f32>, tex_coords: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            tex_coords,
            normals,
            indices,
        }
    }

    /// Splits interleaved shape geometry into a mesh
    pub fn from_flat(geometry: &FlatGeometry) -> Self {
        let count = geometry.vertex_count();
        let mut mesh = Self {
            vertices: Vec::with_capacity(count * 3),
            tex_coords: Vec::with_capacity(count * 2),
            normals: Vec::with_capacity(count * 3),
            indices: geometry.indices.clone(),
        };
        for vertex in geometry.vertices.chunks_exact(VERTEX_FLOATS) {
            mesh.vertices.extend_from_slice(&vertex[0..3]);
            mesh.tex_coords.extend_from_slice(&vertex[3..5]);
            mesh.normals.extend_from_slice(&vertex[5..8]);
        }
        mesh
    }

    /// Loads every model in an OBJ file into one mesh. MTL files are ignored.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Self> {
        let (models, _materials) = tobj::load_obj(path.as_ref(), &load_options())?;
        Ok(Self::from_models(&models))
    }

    /// Parses OBJ source already in memory
    pub fn from_obj_reader<R: BufRead>(reader: &mut R) -> Result<Self> {
        let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })?;
        Ok(Self::from_models(&models))
    }

    pub fn from_obj_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = std::io::Cursor::new(bytes);
        Self::from_obj_reader(&mut reader)
    }

    fn from_models(models: &[tobj::Model]) -> Self {
        let mut combined = Self::default();
        let textured = models.iter().all(|m| !m.mesh.texcoords.is_empty());
        for model in models {
            let mesh = &model.mesh;
            let base = combined.vertex_count() as u32;

            // Use normals from OBJ if available, otherwise calculate them
            let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
                mesh.normals.clone()
            } else {
                log::debug!("OBJ model '{}' has no normals, calculating them", model.name);
                Self::calculate_vertex_normals(&mesh.positions, &mesh.indices)
            };

            combined.vertices.extend_from_slice(&mesh.positions);
            combined.normals.extend_from_slice(&normals);
            if textured {
                combined.tex_coords.extend_from_slice(&mesh.texcoords);
            }
            combined.indices.extend(mesh.indices.iter().map(|i| i + base));
        }
        combined
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn has_tex_coords(&self) -> bool {
        !self.tex_coords.is_empty()
    }

    fn position(&self, index: usize) -> Vector3<f32> {
        Vector3::new(
            self.vertices[index * 3],
            self.vertices[index * 3 + 1],
            self.vertices[index * 3 + 2],
        )
    }

    fn triangle_normal(&self, triangle: &[u32]) -> Vector3<f32> {
        let v0 = self.position(triangle[0] as usize);
        let edge1 = self.position(triangle[1] as usize) - v0;
        let edge2 = self.position(triangle[2] as usize) - v0;
        let n = edge1.cross(edge2);
        if n.magnitude2() > 0.0 {
            n.normalize()
        } else {
            n
        }
    }

    /// Smooth per-vertex normals averaged over the adjoining triangles
    pub fn calculate_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
        let vertex_count = positions.len() / 3;
        let mut normals = vec![0.0; positions.len()];
        let mut counts = vec![0u32; vertex_count];
        let at = |i: usize| Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

        for triangle in indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
            let face_normal = (at(i1) - at(i0)).cross(at(i2) - at(i0));
            for vertex in [i0, i1, i2] {
                normals[vertex * 3] += face_normal.x;
                normals[vertex * 3 + 1] += face_normal.y;
                normals[vertex * 3 + 2] += face_normal.z;
                counts[vertex] += 1;
            }
        }

        for (normal, &count) in normals.chunks_exact_mut(3).zip(&counts) {
            if count == 0 {
                continue;
            }
            let v = Vector3::new(normal[0], normal[1], normal[2]);
            if v.magnitude2() > 0.0 {
                let v = v.normalize();
                normal.copy_from_slice(&[v.x, v.y, v.z]);
            }
        }
        normals
    }

    /// Overwrites normals with flat per-triangle normals.
    ///
    /// Shared vertices end up with the normal of the last triangle using them.
    pub fn synthesize_normals(&mut self) {
        if self.normals.len() != self.vertices.len() {
            self.normals = vec![0.0; self.vertices.len()];
        }
        for t in 0..self.indices.len() / 3 {
            let triangle = [self.indices[t * 3], self.indices[t * 3 + 1], self.indices[t * 3 + 2]];
            let n = self.triangle_normal(&triangle);
            for index in triangle {
                let base = index as usize * 3;
                self.normals[base..base + 3].copy_from_slice(&[n.x, n.y, n.z]);
            }
        }
    }

    /// Bounds plus a suggested scale/translate that grounds and centres the mesh
    pub fn analyse(&self) -> Option<MeshAnalysis> {
        let bounds = FlatGeometry::new(
            self.vertices
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 0.0, 0.0, 0.0, 0.0, 0.0])
                .collect(),
            Vec::new(),
        )
        .bounds()?;
        let [x_range, y_range, z_range] = bounds.size();
        let suggested_scale = (FIT_IN_DIMENSION / x_range)
            .min(FIT_IN_DIMENSION / y_range)
            .min(FIT_IN_DIMENSION / z_range);

        let centre_x = bounds.max[0] - x_range / 2.0;
        let centre_z = bounds.max[2] - z_range / 2.0;
        let suggested_translate = Vector3::new(-centre_x, -bounds.min[1], -centre_z);

        let normal_lengths = self
            .normals
            .chunks_exact(3)
            .map(|n| Vector3::new(n[0], n[1], n[2]).magnitude())
            .collect();

        Some(MeshAnalysis {
            bounds,
            suggested_scale,
            suggested_translate,
            suggested_scaled_translate: suggested_translate * suggested_scale,
            normal_lengths,
        })
    }

    /// Hard translate: moves every vertex by `shunt`
    pub fn shunt(&mut self, shunt: Vector3<f32>) {
        for p in self.vertices.chunks_exact_mut(3) {
            p[0] += shunt.x;
            p[1] += shunt.y;
            p[2] += shunt.z;
        }
    }

    /// Hard turn: rotates vertices and normals by Euler angles in radians
    pub fn turn(&mut self, rotation: Vector3<f32>) {
        let q = euler_quaternion(rotation.x, rotation.y, rotation.z);
        for data in [&mut self.vertices, &mut self.normals] {
            for p in data.chunks_exact_mut(3) {
                let v = q.rotate_vector(Vector3::new(p[0], p[1], p[2]));
                p.copy_from_slice(&[v.x, v.y, v.z]);
            }
        }
    }
}
