//! # Shape Variants
//!
//! Every renderable object owns a [`Shape`] that turns its parameters into raw
//! geometry. Grounded shapes are centred in X and Z with their base at y = 0.

use std::f32::consts::PI;
use std::fmt;
use std::rc::Rc;

use cgmath::{InnerSpace, Vector3};
use indexmap::IndexMap;

use super::poly::{tex, Poly, Vert};
use super::stl::parse_stl_source;
use super::{FlatGeometry, Geometry};
use crate::gfx::mesh::Mesh;

/// Something that can divulge its geometry.
///
/// Shapes that expose addressable faces list their names in
/// [`Shape::face_names`] and return [`Geometry::Faced`] with matching keys.
pub trait Shape: fmt::Debug {
    fn divulge(&self) -> Geometry;

    fn face_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Mesh-backed shapes bypass divulge entirely
    fn mesh(&self) -> Option<Rc<Mesh>> {
        None
    }

    /// Uniform scale the shape asks its drawable to apply
    fn scale_factor(&self) -> Option<f32> {
        None
    }
}

/// Shape of a container: no geometry at all
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerShape;

impl Shape for ContainerShape {
    fn divulge(&self) -> Geometry {
        Geometry::Empty
    }
}

/// Corner vertices shared by the cuboid variants
struct CuboidCorners {
    a: Vert,
    b: Vert,
    c: Vert,
    d: Vert,
    e: Vert,
    f: Vert,
    g: Vert,
    h: Vert,
}

impl CuboidCorners {
    fn new(width: f32, height: f32, depth: f32) -> Self {
        let (xplus, xminus) = (0.5 * width, -0.5 * width);
        let (zplus, zminus) = (0.5 * depth, -0.5 * depth);
        let (yplus, yminus) = (height, 0.0);
        Self {
            a: Vert::new(xminus, yplus, zplus),
            b: Vert::new(xplus, yplus, zplus),
            c: Vert::new(xplus, yminus, zplus),
            d: Vert::new(xminus, yminus, zplus),
            e: Vert::new(xplus, yminus, zminus),
            f: Vert::new(xplus, yplus, zminus),
            g: Vert::new(xminus, yminus, zminus),
            h: Vert::new(xminus, yplus, zminus),
        }
    }

    fn front(&self, poly: &mut Poly) {
        poly.normal(0.0, 0.0, 1.0);
        poly.add(self.a, tex::TL, self.d, tex::BL, self.b, tex::TR);
        poly.add(self.d, tex::BL, self.c, tex::BR, self.b, tex::TR);
    }

    fn back(&self, poly: &mut Poly) {
        poly.normal(0.0, 0.0, -1.0);
        poly.add(self.f, tex::TL, self.e, tex::BL, self.h, tex::TR);
        poly.add(self.e, tex::BL, self.g, tex::BR, self.h, tex::TR);
    }

    fn left(&self, poly: &mut Poly) {
        poly.normal(-1.0, 0.0, 0.0);
        poly.add(self.h, tex::TL, self.g, tex::BL, self.a, tex::TR);
        poly.add(self.g, tex::BL, self.d, tex::BR, self.a, tex::TR);
    }

    fn right(&self, poly: &mut Poly) {
        poly.normal(1.0, 0.0, 0.0);
        poly.add(self.b, tex::TL, self.c, tex::BL, self.f, tex::TR);
        poly.add(self.c, tex::BL, self.e, tex::BR, self.f, tex::TR);
    }

    fn top(&self, poly: &mut Poly) {
        poly.normal(0.0, 1.0, 0.0);
        poly.add(self.h, tex::TL, self.a, tex::BL, self.f, tex::TR);
        poly.add(self.a, tex::BL, self.b, tex::BR, self.f, tex::TR);
    }

    fn bottom(&self, poly: &mut Poly) {
        poly.normal(0.0, -1.0, 0.0);
        poly.add(self.d, tex::TL, self.g, tex::BL, self.c, tex::TR);
        poly.add(self.g, tex::BL, self.e, tex::BR, self.c, tex::TR);
    }

    fn single_face(&self, sides: &[fn(&Self, &mut Poly)]) -> FlatGeometry {
        let mut poly = Poly::new();
        for side in sides {
            side(self, &mut poly);
        }
        poly.divulge()
    }
}

/// Cuboid with a single surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleCuboid {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl SimpleCuboid {
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

impl Shape for SimpleCuboid {
    fn divulge(&self) -> Geometry {
        let corners = CuboidCorners::new(self.width, self.height, self.depth);
        Geometry::Flat(corners.single_face(&[
            CuboidCorners::front,
            CuboidCorners::back,
            CuboidCorners::left,
            CuboidCorners::right,
            CuboidCorners::top,
            CuboidCorners::bottom,
        ]))
    }
}

/// Cuboid with six addressable faces.
///
/// Prefer [`SimpleCuboid`] unless the faces really need separate textures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundedCuboid {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl GroundedCuboid {
    pub const FACES: [&'static str; 6] = ["front", "back", "left", "right", "top", "bottom"];

    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

impl Shape for GroundedCuboid {
    fn divulge(&self) -> Geometry {
        let corners = CuboidCorners::new(self.width, self.height, self.depth);
        let sides: [fn(&CuboidCorners, &mut Poly); 6] = [
            CuboidCorners::front,
            CuboidCorners::back,
            CuboidCorners::left,
            CuboidCorners::right,
            CuboidCorners::top,
            CuboidCorners::bottom,
        ];
        let faces = Self::FACES
            .iter()
            .zip(sides)
            .map(|(name, side)| (name.to_string(), corners.single_face(&[side])))
            .collect();
        Geometry::Faced(faces)
    }

    fn face_names(&self) -> &'static [&'static str] {
        &Self::FACES
    }
}

/// Cuboid with a front, a caption strip and everything else.
///
/// Set `no_texture` on the caption face when it is unused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardCuboid {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl BoardCuboid {
    pub const FACES: [&'static str; 3] = ["front", "other", "caption"];

    /// Distance the caption sits in front of the board
    pub const CAPTION_OFFSET: f32 = 0.05;

    pub const CAPTION_HEIGHT: f32 = 0.5;

    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

impl Shape for BoardCuboid {
    fn divulge(&self) -> Geometry {
        let corners = CuboidCorners::new(self.width, self.height, self.depth);
        let (xplus, xminus) = (0.5 * self.width, -0.5 * self.width);
        let cfront = 0.5 * self.depth + Self::CAPTION_OFFSET;
        let ctop = Self::CAPTION_HEIGHT;
        let ca = Vert::new(xminus, 0.0, cfront);
        let cb = Vert::new(xplus, 0.0, cfront);
        let cc = Vert::new(xplus, ctop, cfront);
        let cd = Vert::new(xminus, ctop, cfront);

        let mut caption = Poly::new();
        caption.normal(0.0, 0.0, 1.0);
        caption.add(ca, tex::BL, cb, tex::BR, cc, tex::TR);
        caption.add(ca, tex::BL, cc, tex::TR, cd, tex::TL);

        let mut faces = IndexMap::new();
        faces.insert("front".to_string(), corners.single_face(&[CuboidCorners::front]));
        faces.insert(
            "other".to_string(),
            corners.single_face(&[
                CuboidCorners::back,
                CuboidCorners::left,
                CuboidCorners::right,
                CuboidCorners::top,
                CuboidCorners::bottom,
            ]),
        );
        faces.insert("caption".to_string(), caption.divulge());
        Geometry::Faced(faces)
    }

    fn face_names(&self) -> &'static [&'static str] {
        &Self::FACES
    }
}

/// Very basic hand-controller wedge. Usually a loaded model is nicer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerShape;

impl Shape for ControllerShape {
    fn divulge(&self) -> Geometry {
        let mut poly = Poly::new().with_offset(-0.02, 0.0, 0.17);

        let a = Vert::new(0.00, 0.00, 0.00);
        let b = Vert::new(0.04, 0.00, 0.00);
        let c = Vert::new(0.00, -0.03, -0.16);
        let d = Vert::new(0.04, -0.03, -0.16);
        let e = Vert::new(0.04, 0.00, -0.18);
        let f = Vert::new(0.00, 0.00, -0.18);
        let g = Vert::new(0.00, -0.06, -0.22);
        let h = Vert::new(0.04, -0.06, -0.22);
        let i = Vert::new(0.04, -0.03, -0.00);
        let k = Vert::new(0.04, -0.08, -0.21);
        let l = Vert::new(0.00, -0.08, -0.21);
        let m = Vert::new(0.00, -0.03, -0.00);
        let no = tex::NO;

        // top
        poly.normal(0.0, 1.0, 0.0);
        poly.add(a, tex::BL, b, tex::BR, e, tex::TR);
        poly.add(a, tex::BL, e, tex::TR, f, tex::TL);
        poly.add(f, no, e, no, h, no);
        poly.add(h, no, g, no, f, no);

        // bottom
        poly.normal(0.0, -1.0, 0.0);
        poly.add(i, no, m, no, c, no);
        poly.add(i, no, c, no, d, no);
        poly.add(d, no, c, no, l, no);
        poly.add(l, no, k, no, d, no);

        // left
        poly.normal(-1.0, 0.0, 0.0);
        poly.add(m, no, a, no, f, no);
        poly.add(f, no, c, no, m, no);
        poly.add(f, no, g, no, c, no);
        poly.add(c, no, g, no, l, no);

        // right
        poly.normal(1.0, 0.0, 0.0);
        poly.add(b, no, i, no, d, no);
        poly.add(b, no, d, no, e, no);
        poly.add(d, no, k, no, e, no);
        poly.add(e, no, k, no, h, no);

        // back tip, toward the user
        poly.normal(0.0, 0.0, 1.0);
        poly.add(m, no, i, no, b, no);
        poly.add(b, no, a, no, m, no);

        // front tip
        poly.normal(0.0, 0.0, -1.0);
        poly.add(k, no, l, no, g, no);
        poly.add(g, no, h, no, k, no);

        Geometry::Flat(poly.divulge())
    }
}

/// Planar shape split into segments so textures tile per segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallShape {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub segments_x: u32,
    pub segments_y: u32,
}

impl Default for WallShape {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 10.0,
            min_y: 0.0,
            max_y: 10.0,
            segments_x: 10,
            segments_y: 10,
        }
    }
}

impl WallShape {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            ..Default::default()
        }
    }

    pub fn with_segments(mut self, segments_x: u32, segments_y: u32) -> Self {
        self.segments_x = segments_x.max(1);
        self.segments_y = segments_y.max(1);
        self
    }
}

impl Shape for WallShape {
    fn divulge(&self) -> Geometry {
        let mut poly = Poly::new();
        poly.normal(0.0, 0.0, 1.0);

        let seg_x = (self.max_x - self.min_x) / self.segments_x as f32;
        let seg_y = (self.max_y - self.min_y) / self.segments_y as f32;
        for ix in 0..self.segments_x {
            for jy in 0..self.segments_y {
                let xlo = self.min_x + ix as f32 * seg_x;
                let xhi = xlo + seg_x;
                let ylo = self.min_y + jy as f32 * seg_y;
                let yhi = ylo + seg_y;
                let a = Vert::new(xlo, ylo, 0.0);
                let b = Vert::new(xhi, ylo, 0.0);
                let c = Vert::new(xhi, yhi, 0.0);
                let d = Vert::new(xlo, yhi, 0.0);
                poly.add(a, tex::BL, b, tex::BR, c, tex::TR);
                poly.add(a, tex::BL, c, tex::TR, d, tex::TL);
            }
        }
        Geometry::Flat(poly.divulge())
    }
}

/// Adds one quad of a surface of revolution with the requested winding
fn add_segment_quad(poly: &mut Poly, quad: [Vert; 4], tex_l: f32, tex_r: f32, face_inwards: bool) {
    let [a, b, c, d] = quad;
    let (bl, br, tl, tr) = ([tex_l, 1.0], [tex_r, 1.0], [tex_l, 0.0], [tex_r, 0.0]);
    if face_inwards {
        poly.add(a, bl, b, br, c, tr);
        poly.add(a, bl, c, tr, d, tl);
    } else {
        poly.add(c, tr, b, br, a, bl);
        poly.add(d, tl, c, tr, a, bl);
    }
}

/// Open cylinder standing on y = 0, texcoords spread evenly around it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderShape {
    pub radius: f32,
    pub height: f32,
    pub segment_count: u32,
    pub segments_face_inwards: bool,
}

impl Default for CylinderShape {
    fn default() -> Self {
        Self {
            radius: 1.0,
            height: 1.0,
            segment_count: 100,
            segments_face_inwards: false,
        }
    }
}

impl CylinderShape {
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height,
            ..Default::default()
        }
    }

    pub fn with_segment_count(mut self, segment_count: u32) -> Self {
        self.segment_count = segment_count.max(1);
        self
    }

    pub fn facing_inwards(mut self) -> Self {
        self.segments_face_inwards = true;
        self
    }
}

impl Shape for CylinderShape {
    fn divulge(&self) -> Geometry {
        let mut poly = Poly::new();
        let angle_per = 2.0 * PI / self.segment_count as f32;
        let tex_incr = 1.0 / self.segment_count as f32;
        let r = self.radius;
        for i in 0..self.segment_count {
            let (lo, hi) = (angle_per * i as f32, angle_per * (i + 1) as f32);
            let quad = [
                Vert::new(lo.cos() * r, 0.0, lo.sin() * r),
                Vert::new(hi.cos() * r, 0.0, hi.sin() * r),
                Vert::new(hi.cos() * r, self.height, hi.sin() * r),
                Vert::new(lo.cos() * r, self.height, lo.sin() * r),
            ];
            let mid = angle_per * (i as f32 + 0.5);
            poly.normal(mid.cos(), 0.0, mid.sin());
            add_segment_quad(
                &mut poly,
                quad,
                tex_incr * i as f32,
                tex_incr * (i + 1) as f32,
                self.segments_face_inwards,
            );
        }
        Geometry::Flat(poly.divulge())
    }
}

/// Radius profile sampled bottom to top as `(segment_index, segment_count)`
#[derive(Clone)]
pub enum ProfileSampler {
    /// Equally spaced radius values
    Points(Vec<f32>),
    Function(Rc<dyn Fn(usize, usize) -> f32>),
}

impl ProfileSampler {
    pub fn function(f: impl Fn(usize, usize) -> f32 + 'static) -> Self {
        ProfileSampler::Function(Rc::new(f))
    }

    pub fn sample(&self, index: usize, count: usize) -> f32 {
        match self {
            ProfileSampler::Points(points) => clamped_point(points, index).unwrap_or(1.0),
            ProfileSampler::Function(f) => f(index, count),
        }
    }
}

impl fmt::Debug for ProfileSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileSampler::Points(points) => f.debug_tuple("Points").field(points).finish(),
            ProfileSampler::Function(_) => f.write_str("Function(..)"),
        }
    }
}

fn clamped_point(points: &[f32], index: usize) -> Option<f32> {
    points.get(index).or(points.last()).copied()
}

/// Surface of revolution defined by a radius profile
#[derive(Debug, Clone)]
pub struct LatheShape {
    pub height: f32,
    pub segment_count: u32,
    pub segments_face_inwards: bool,
    pub profile: ProfileSampler,
    pub vertical_segment_count: usize,
}

impl LatheShape {
    /// Lathe from radius values; one vertical segment per adjacent pair
    pub fn from_profile(height: f32, profile: Vec<f32>) -> Self {
        let vertical_segment_count = profile.len().saturating_sub(1).max(1);
        Self {
            height,
            segment_count: 100,
            segments_face_inwards: false,
            profile: ProfileSampler::Points(profile),
            vertical_segment_count,
        }
    }

    /// Lathe from a sampler function, 100 vertical segments
    pub fn from_sampler(height: f32, sampler: impl Fn(usize, usize) -> f32 + 'static) -> Self {
        Self {
            height,
            segment_count: 100,
            segments_face_inwards: false,
            profile: ProfileSampler::function(sampler),
            vertical_segment_count: 100,
        }
    }

    pub fn with_segment_count(mut self, segment_count: u32) -> Self {
        self.segment_count = segment_count.max(1);
        self
    }

    pub fn with_vertical_segment_count(mut self, count: usize) -> Self {
        self.vertical_segment_count = count.max(1);
        self
    }

    pub fn facing_inwards(mut self) -> Self {
        self.segments_face_inwards = true;
        self
    }
}

impl Default for LatheShape {
    fn default() -> Self {
        Self::from_profile(1.0, vec![1.0, 0.0])
    }
}

impl Shape for LatheShape {
    fn divulge(&self) -> Geometry {
        let mut poly = Poly::new();
        let vcount = self.vertical_segment_count;
        let segment_height = self.height / vcount as f32;
        let angle_per = 2.0 * PI / self.segment_count as f32;
        let tex_incr = 1.0 / self.segment_count as f32;

        for i in 0..vcount {
            let (ylo, yhi) = (segment_height * i as f32, segment_height * (i + 1) as f32);
            let r1 = self.profile.sample(i, vcount);
            let r2 = self.profile.sample(i + 1, vcount);
            for j in 0..self.segment_count {
                let (lo, hi) = (angle_per * j as f32, angle_per * (j + 1) as f32);
                let quad = [
                    Vert::new(lo.cos() * r1, ylo, lo.sin() * r1),
                    Vert::new(hi.cos() * r1, ylo, hi.sin() * r1),
                    Vert::new(hi.cos() * r2, yhi, hi.sin() * r2),
                    Vert::new(lo.cos() * r2, yhi, lo.sin() * r2),
                ];
                let mid = angle_per * (j as f32 + 0.5);
                poly.normal(mid.cos(), 0.0, mid.sin());
                add_segment_quad(
                    &mut poly,
                    quad,
                    tex_incr * j as f32,
                    tex_incr * (j + 1) as f32,
                    self.segments_face_inwards,
                );
            }
        }
        Geometry::Flat(poly.divulge())
    }
}

/// How an extruder's radius profile is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerKind {
    /// Profile values as given
    Basic,
    /// Pinched to a point at both ends, profile (or 1) in between
    #[default]
    Extrude,
    /// Like `Extrude` with a short bevel at each end
    BeveledExtrude,
}

const PINCH: f32 = 0.00001;

impl SamplerKind {
    pub fn sample(self, profile: Option<&[f32]>, index: usize, count: usize) -> f32 {
        let inner = || profile.and_then(|p| clamped_point(p, index)).unwrap_or(1.0);
        match self {
            SamplerKind::Basic => inner(),
            SamplerKind::Extrude => {
                if index == 0 || index >= count {
                    PINCH
                } else {
                    inner()
                }
            }
            SamplerKind::BeveledExtrude => {
                let frac = index as f32 / count as f32;
                if index == 0 || index >= count {
                    PINCH
                } else if frac > 0.95 {
                    1.0 - (0.04 - (1.0 - frac))
                } else if frac < 0.05 {
                    1.0 - (0.04 - frac)
                } else {
                    inner()
                }
            }
        }
    }
}

/// Cross-section outline of an extruder, as XZ points
#[derive(Clone)]
pub enum ShapeSampler {
    Points(Vec<[f32; 2]>),
    Function {
        point_count: usize,
        sampler: Rc<dyn Fn(usize, usize) -> [f32; 2]>,
    },
}

impl ShapeSampler {
    pub fn function(point_count: usize, f: impl Fn(usize, usize) -> [f32; 2] + 'static) -> Self {
        ShapeSampler::Function {
            point_count,
            sampler: Rc::new(f),
        }
    }

    fn points(&self) -> Vec<[f32; 2]> {
        match self {
            ShapeSampler::Points(points) => points.clone(),
            ShapeSampler::Function {
                point_count,
                sampler,
            } => (0..*point_count).map(|i| sampler(i, *point_count)).collect(),
        }
    }
}

impl fmt::Debug for ShapeSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeSampler::Points(points) => f.debug_tuple("Points").field(points).finish(),
            ShapeSampler::Function { point_count, .. } => f
                .debug_struct("Function")
                .field("point_count", point_count)
                .finish_non_exhaustive(),
        }
    }
}

/// A cross-section swept up the Y axis and scaled by a radius profile.
///
/// With `endcap` set the first and last segments get straight down / up
/// normals so the pinched ends read as caps.
#[derive(Debug, Clone)]
pub struct LatheExtruderShape {
    pub height: f32,
    pub scale: f32,
    pub segments_face_inwards: bool,
    pub endcap: bool,
    pub profile_segment_count: usize,
    pub profile_points: Option<Vec<f32>>,
    pub profile_sampler: Option<ProfileSampler>,
    pub sampler_kind: SamplerKind,
    pub shape: ShapeSampler,
}

impl LatheExtruderShape {
    pub fn new(height: f32, shape: ShapeSampler) -> Self {
        Self {
            height,
            scale: 1.0,
            segments_face_inwards: false,
            endcap: true,
            profile_segment_count: 100,
            profile_points: None,
            profile_sampler: None,
            sampler_kind: SamplerKind::default(),
            shape,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_profile(mut self, points: Vec<f32>, kind: SamplerKind) -> Self {
        self.profile_points = Some(points);
        self.sampler_kind = kind;
        self
    }

    pub fn with_sampler_kind(mut self, kind: SamplerKind) -> Self {
        self.sampler_kind = kind;
        self
    }

    pub fn with_profile_sampler(mut self, sampler: ProfileSampler) -> Self {
        self.profile_sampler = Some(sampler);
        self
    }

    pub fn with_profile_segment_count(mut self, count: usize) -> Self {
        self.profile_segment_count = count.max(1);
        self
    }

    pub fn facing_inwards(mut self) -> Self {
        self.segments_face_inwards = true;
        self
    }

    fn radius(&self, index: usize) -> f32 {
        let count = self.profile_segment_count;
        match &self.profile_sampler {
            Some(sampler) => sampler.sample(index, count),
            None => self
                .sampler_kind
                .sample(self.profile_points.as_deref(), index, count),
        }
    }
}

fn face_normal(v1: Vert, v2: Vert, v3: Vert) -> [f32; 3] {
    let p1 = Vector3::new(v1.x, v1.y, v1.z);
    let u = Vector3::new(v2.x, v2.y, v2.z) - p1;
    let v = Vector3::new(v3.x, v3.y, v3.z) - p1;
    let n = u.cross(v);
    if n.magnitude2() > 0.0 {
        n.normalize().into()
    } else {
        [0.0, 0.0, 0.0]
    }
}

impl Shape for LatheExtruderShape {
    fn divulge(&self) -> Geometry {
        let mut poly = Poly::new();
        let count = self.profile_segment_count;
        let segment_height = self.height / count as f32;
        let points = self.shape.points();
        let n = points.len();
        if n == 0 {
            return Geometry::Flat(poly.divulge());
        }
        let tex_incr = 1.0 / n as f32;
        let s = self.scale;

        for i in 0..count {
            let (ylo, yhi) = (segment_height * i as f32, segment_height * (i + 1) as f32);
            let r1 = self.radius(i);
            let r2 = self.radius(i + 1);
            for j in 0..n {
                let sp0 = points[if j == 0 { n - 1 } else { j - 1 }];
                let sp1 = points[j];
                let a = Vert::new(sp0[0] * r1 * s, ylo, sp0[1] * r1 * s);
                let b = Vert::new(sp1[0] * r1 * s, ylo, sp1[1] * r1 * s);
                let c = Vert::new(sp1[0] * r2 * s, yhi, sp1[1] * r2 * s);
                let d = Vert::new(sp0[0] * r2 * s, yhi, sp0[1] * r2 * s);

                if self.endcap && i + 1 == count {
                    poly.normal(0.0, 1.0, 0.0);
                } else if self.endcap && i == 0 {
                    poly.normal(0.0, -1.0, 0.0);
                } else {
                    let [nx, ny, nz] = face_normal(c, b, a);
                    poly.normal(nx, ny, nz);
                }
                add_segment_quad(
                    &mut poly,
                    [a, b, c, d],
                    tex_incr * j as f32,
                    tex_incr * (j + 1) as f32,
                    self.segments_face_inwards,
                );
            }
        }
        Geometry::Flat(poly.divulge())
    }
}

/// Legacy shape built from ASCII STL source. Prefer [`MeshShape`].
#[derive(Debug, Clone)]
pub struct StlShape {
    pub source: String,
    pub scale: f32,
}

impl StlShape {
    pub fn new(source: impl Into<String>, scale: f32) -> Self {
        Self {
            source: source.into(),
            scale,
        }
    }
}

impl Shape for StlShape {
    fn divulge(&self) -> Geometry {
        Geometry::Flat(parse_stl_source(&self.source, self.scale))
    }
}

/// Wraps a loaded mesh so it can be drawn
#[derive(Debug, Clone)]
pub struct MeshShape {
    pub mesh: Rc<Mesh>,
    pub scale: f32,
}

impl MeshShape {
    pub fn new(mesh: Rc<Mesh>) -> Self {
        Self { mesh, scale: 1.0 }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

impl Shape for MeshShape {
    fn divulge(&self) -> Geometry {
        Geometry::Empty
    }

    fn mesh(&self) -> Option<Rc<Mesh>> {
        Some(self.mesh.clone())
    }

    fn scale_factor(&self) -> Option<f32> {
        Some(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(geometry: Geometry) -> FlatGeometry {
        match geometry {
            Geometry::Flat(flat) => flat,
            other => panic!("expected flat geometry, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_cuboid_is_grounded() {
        let geometry = flat(SimpleCuboid::new(2.0, 3.0, 4.0).divulge());
        assert_eq!(geometry.indices.len(), 36);
        let bounds = geometry.bounds().unwrap();
        assert_eq!(bounds.min, [-1.0, 0.0, -2.0]);
        assert_eq!(bounds.max, [1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_grounded_cuboid_faces() {
        let cuboid = GroundedCuboid::new(1.0, 1.0, 1.0);
        let Geometry::Faced(faces) = cuboid.divulge() else {
            panic!("expected faces");
        };
        let names: Vec<&str> = faces.keys().map(String::as_str).collect();
        assert_eq!(names, cuboid.face_names());
        for face in faces.values() {
            assert_eq!(face.indices.len(), 6);
        }
        assert_eq!(faces["top"].normal(0), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_board_caption_sits_in_front() {
        let Geometry::Faced(faces) = BoardCuboid::new(2.0, 1.5, 0.2).divulge() else {
            panic!("expected faces");
        };
        assert_eq!(faces["other"].indices.len(), 30);
        let caption = faces["caption"].bounds().unwrap();
        assert!((caption.min[2] - 0.15).abs() < 1e-6);
        assert_eq!(caption.max[1], 0.5);
    }

    #[test]
    fn test_wall_segments() {
        let wall = WallShape::new(0.0, 2.0, 0.0, 1.0).with_segments(2, 1);
        let geometry = flat(wall.divulge());
        assert_eq!(geometry.indices.len(), 12);

        // each quad spans its own segment with texcoords covering [0,1]
        let first: Vec<[f32; 3]> = (0..6).map(|i| geometry.position(i)).collect();
        assert!(first.iter().all(|p| p[0] >= 0.0 && p[0] <= 1.0));
        let second: Vec<[f32; 3]> = (6..12).map(|i| geometry.position(i)).collect();
        assert!(second.iter().all(|p| p[0] >= 1.0 && p[0] <= 2.0));
        for quad in 0..2 {
            let uvs: Vec<[f32; 2]> = (quad * 6..quad * 6 + 6).map(|i| geometry.tex_coord(i)).collect();
            assert!(uvs.contains(&tex::BL));
            assert!(uvs.contains(&tex::BR));
            assert!(uvs.contains(&tex::TR));
            assert!(uvs.contains(&tex::TL));
        }
    }

    #[test]
    fn test_wall_defaults() {
        let geometry = flat(WallShape::default().divulge());
        assert_eq!(geometry.triangle_count(), 200);
    }

    #[test]
    fn test_cylinder_winding() {
        let outward = flat(CylinderShape::new(1.0, 2.0).with_segment_count(4).divulge());
        let inward = flat(
            CylinderShape::new(1.0, 2.0)
                .with_segment_count(4)
                .facing_inwards()
                .divulge(),
        );
        assert_eq!(outward.indices.len(), 24);
        assert_eq!(outward.position(0), inward.position(2));
        assert_eq!(outward.bounds().unwrap().max[1], 2.0);
    }

    #[test]
    fn test_lathe_profile() {
        let lathe = LatheShape::from_profile(2.0, vec![1.0, 0.5, 0.25]).with_segment_count(8);
        assert_eq!(lathe.vertical_segment_count, 2);
        let geometry = flat(lathe.divulge());
        assert_eq!(geometry.triangle_count(), 2 * 8 * 2);
        let bounds = geometry.bounds().unwrap();
        assert!((bounds.max[0] - 1.0).abs() < 1e-5);
        assert!((bounds.max[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_extrude_sampler_pinches_ends() {
        let profile = [0.3, 0.6, 0.9];
        assert_eq!(SamplerKind::Extrude.sample(Some(&profile), 0, 10), PINCH);
        assert_eq!(SamplerKind::Extrude.sample(Some(&profile), 10, 10), PINCH);
        assert_eq!(SamplerKind::Extrude.sample(None, 5, 10), 1.0);
        assert_eq!(SamplerKind::Basic.sample(Some(&profile), 1, 10), 0.6);
        let bevel = SamplerKind::BeveledExtrude.sample(None, 1, 100);
        assert!((bevel - 0.97).abs() < 1e-5);
    }

    #[test]
    fn test_extruder_endcaps() {
        let square = ShapeSampler::Points(vec![[1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]]);
        let extruder = LatheExtruderShape::new(1.0, square).with_profile_segment_count(3);
        let geometry = flat(extruder.divulge());
        assert_eq!(geometry.triangle_count(), 3 * 4 * 2);
        assert_eq!(geometry.normal(0), [0.0, -1.0, 0.0]);
        assert_eq!(geometry.normal(geometry.vertex_count() - 1), [0.0, 1.0, 0.0]);
        let side = geometry.normal(24);
        assert!((side[1]).abs() < 1e-5);
    }

    #[test]
    fn test_controller_offset() {
        let geometry = flat(ControllerShape.divulge());
        assert_eq!(geometry.triangle_count(), 20);
        assert!((geometry.position(0)[0] + 0.02).abs() < 1e-6);
        assert!((geometry.position(0)[2] - 0.17).abs() < 1e-6);
    }
}
