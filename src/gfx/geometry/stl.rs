//! ASCII STL parsing.
//!
//! Only `facet normal`, `vertex` and `endfacet` lines matter; everything else
//! (solid names, `outer loop`) is ignored. Each completed facet becomes one
//! untextured triangle.

use super::poly::{tex, Poly, Vert};
use super::FlatGeometry;

fn parse_triple<'a>(mut parts: impl Iterator<Item = &'a str>) -> Option<[f32; 3]> {
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    Some([x, y, z])
}

/// Parses ASCII STL source into flat geometry, scaling every vertex.
///
/// Facets with fewer than three vertices are dropped; malformed numbers make
/// the line count as unrecognised.
pub fn parse_stl_source(source: &str, scale: f32) -> FlatGeometry {
    let mut poly = Poly::new();
    let mut verts: Vec<Vert> = Vec::with_capacity(3);

    for line in source.lines() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("facet") if words.next() == Some("normal") => {
                if let Some([x, y, z]) = parse_triple(words) {
                    poly.normal(x, y, z);
                }
                verts.clear();
            }
            Some("vertex") => {
                if let Some([x, y, z]) = parse_triple(words) {
                    verts.push(Vert::new(x * scale, y * scale, z * scale));
                }
            }
            Some("endfacet") => {
                if let [a, b, c, ..] = verts.as_slice() {
                    poly.add(*a, tex::NO, *b, tex::NO, *c, tex::NO);
                }
                verts.clear();
            }
            _ => {}
        }
    }
    poly.divulge()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA_FACE: &str = "solid test
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0.5 -0.5 1e-3
    outer loop
      vertex 0 0 0
      vertex 1 0 0
    endloop
  endfacet
endsolid test";

    #[test]
    fn test_parse_stl() {
        let geometry = parse_stl_source(TETRA_FACE, 2.0);
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.position(1), [2.0, 0.0, 0.0]);
        assert_eq!(geometry.normal(2), [0.0, 0.0, -1.0]);
        assert_eq!(geometry.tex_coord(0), tex::NO);
    }
}
