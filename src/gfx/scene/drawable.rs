//! # Drawables
//!
//! A [`Drawable`] is the unit the scene renders: a [`Shape`] plus world and
//! model-space transforms, render attributes, animation state, behaviours and
//! named faces.
//!
//! ## Transform composition
//!
//! [`Drawable::transformation_matrix`] maps local geometry one level up the
//! traversal:
//!
//! 1. An injected `matrix` wins unless a recompute is forced. A uniform scale
//!    factor is still post-multiplied.
//! 2. Otherwise the position comes from the active animation or `pos`.
//! 3. Translation is `pos + translation`. World and model translation are
//!    summed as plain vectors; existing content is calibrated against this.
//! 4. Rotation is `euler(rotation) * euler(orientation)`, model rotation on the
//!    left. `current_orientation` overrides `orientation` when set.
//! 5. `T * R * S`, then `inherited_matrix * result` when inherited.
//!
//! Every call returns a fresh matrix. Callers compose with it; they never
//! mutate scene state through it.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use cgmath::{Matrix4, Vector3, Zero};
use indexmap::IndexMap;

use crate::gfx::geometry::{Bounds, ContainerShape, FlatGeometry, Shape};
use crate::gfx::gpu::{DrawMode, ShaderId, TextureId};
use crate::gfx::math::{euler_quaternion, rotation_translation_scale};
use crate::gfx::mesh::Mesh;
use crate::gfx::resources::{Material, TextureImage};
use crate::input::{StageParameters, TrackedDevice};
use crate::time::TimePoint;

use super::face::{Face, GeometryBuffers, MeshBuffers};

/// Produces a texture on demand. Consumed by the render path exactly once.
pub type TextureLoader = Rc<dyn Fn() -> TextureImage>;

/// Maps animation progress in `[0, 1]` to interpolation weight
pub type TimingFunction = Rc<dyn Fn(f32) -> f32>;

/// Per-frame callback run before rendering
pub type Behaviour = Box<dyn FnMut(&mut Drawable, TimePoint, &BehaviourContext)>;

/// Handler for an interaction event such as `select` or `grab`
pub type InteractionHandler = Box<dyn FnMut(&mut Drawable, &Metadata)>;

/// Free-form string metadata attached to drawables and components
pub type Metadata = IndexMap<String, String>;

/// What behaviours can see of the world during a simulation tick
#[derive(Debug, Clone, Copy)]
pub struct BehaviourContext<'a> {
    /// Tracked devices polled once for this tick
    pub devices: &'a [TrackedDevice],
    pub stage: &'a StageParameters,
    pub player_location: Vector3<f32>,
}

/// Smooth symmetric ease: `x^p / (x^p + (1-x)^p)`
pub fn make_easing_function(power: f32) -> TimingFunction {
    Rc::new(move |x: f32| {
        let a = x.powf(power);
        let b = (1.0 - x).powf(power);
        if a + b == 0.0 {
            x
        } else {
            a / (a + b)
        }
    })
}

/// Scale applied when composing the transformation matrix
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Scale {
    #[default]
    Unit,
    Uniform(f32),
    PerAxis(Vector3<f32>),
}

impl Scale {
    pub fn vector(&self) -> Vector3<f32> {
        match *self {
            Scale::Unit => Vector3::new(1.0, 1.0, 1.0),
            Scale::Uniform(s) => Vector3::new(s, s, s),
            Scale::PerAxis(v) => v,
        }
    }

    /// The uniform factor, if any
    pub fn factor(&self) -> Option<f32> {
        match *self {
            Scale::Uniform(s) => Some(s),
            _ => None,
        }
    }
}

/// A tween from one position to another
#[derive(Clone)]
pub struct Animation {
    pub start_pos: Vector3<f32>,
    pub start_time: TimePoint,
    pub end_pos: Vector3<f32>,
    pub end_time: TimePoint,
    pub timing: TimingFunction,
}

impl Animation {
    /// Clamped linear progress at `now`
    pub fn progress(&self, now: TimePoint) -> f32 {
        let span = self.end_time - self.start_time;
        if span <= 0.0 {
            return 1.0;
        }
        ((now - self.start_time) / span).clamp(0.0, 1.0) as f32
    }

    pub fn position_at(&self, now: TimePoint) -> Vector3<f32> {
        let weight = (self.timing)(self.progress(now));
        self.start_pos + (self.end_pos - self.start_pos) * weight
    }

    pub fn is_expired(&self, now: TimePoint) -> bool {
        now > self.end_time
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("start_pos", &self.start_pos)
            .field("start_time", &self.start_time)
            .field("end_pos", &self.end_pos)
            .field("end_time", &self.end_time)
            .finish_non_exhaustive()
    }
}

/// Texture, shader and material references, by value or by label
#[derive(Clone, Default)]
pub struct RenderAttributes {
    pub texture: Option<TextureId>,
    pub texture_label: Option<String>,
    pub left_eye_texture: Option<TextureId>,
    pub right_eye_texture: Option<TextureId>,
    pub texture_loader: Option<TextureLoader>,
    pub shader: Option<ShaderId>,
    pub shader_label: Option<String>,
    /// Older content names its shader here; consulted after `shader`
    pub legacy_shader_label: Option<String>,
    pub material: Option<Material>,
    pub material_label: Option<String>,
    pub draw_mode: DrawMode,
}

impl RenderAttributes {
    /// Field-wise: keep what is set here, take the rest from `fallback`
    pub fn or(&self, fallback: &RenderAttributes) -> RenderAttributes {
        RenderAttributes {
            texture: self.texture.or(fallback.texture),
            texture_label: self.texture_label.clone().or_else(|| fallback.texture_label.clone()),
            left_eye_texture: self.left_eye_texture.or(fallback.left_eye_texture),
            right_eye_texture: self.right_eye_texture.or(fallback.right_eye_texture),
            texture_loader: self.texture_loader.clone().or_else(|| fallback.texture_loader.clone()),
            shader: self.shader.or(fallback.shader),
            shader_label: self.shader_label.clone().or_else(|| fallback.shader_label.clone()),
            legacy_shader_label: self
                .legacy_shader_label
                .clone()
                .or_else(|| fallback.legacy_shader_label.clone()),
            material: self.material.clone().or_else(|| fallback.material.clone()),
            material_label: self.material_label.clone().or_else(|| fallback.material_label.clone()),
            draw_mode: self.draw_mode,
        }
    }
}

impl fmt::Debug for RenderAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderAttributes")
            .field("texture", &self.texture)
            .field("texture_label", &self.texture_label)
            .field("left_eye_texture", &self.left_eye_texture)
            .field("right_eye_texture", &self.right_eye_texture)
            .field("texture_loader", &self.texture_loader.is_some())
            .field("shader", &self.shader)
            .field("shader_label", &self.shader_label)
            .field("legacy_shader_label", &self.legacy_shader_label)
            .field("material", &self.material)
            .field("material_label", &self.material_label)
            .field("draw_mode", &self.draw_mode)
            .finish()
    }
}

/// Authored overrides for one named face
#[derive(Debug, Clone, Default)]
pub struct FaceSpec {
    pub attributes: RenderAttributes,
    /// Blocks texture inheritance; the face is never drawn
    pub no_texture: bool,
}

impl FaceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A face that never renders
    pub fn untextured() -> Self {
        Self {
            no_texture: true,
            ..Default::default()
        }
    }

    pub fn with_texture_label(mut self, label: &str) -> Self {
        self.attributes.texture_label = Some(label.to_string());
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.attributes.texture = Some(texture);
        self
    }

    pub fn with_shader_label(mut self, label: &str) -> Self {
        self.attributes.shader_label = Some(label.to_string());
        self
    }

    pub fn with_material_label(mut self, label: &str) -> Self {
        self.attributes.material_label = Some(label.to_string());
        self
    }

    pub fn with_texture_loader(mut self, loader: TextureLoader) -> Self {
        self.attributes.texture_loader = Some(loader);
        self
    }
}

/// Value stored in a drawable's scratch pad
#[derive(Debug, Clone, PartialEq)]
pub enum ScratchValue {
    Flag(bool),
    Number(f32),
    Values(Vec<f32>),
    Text(String),
}

/// Per-drawable scratch state written by behaviours
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScratchPad {
    values: HashMap<String, ScratchValue>,
}

impl ScratchPad {
    pub fn get(&self, key: &str) -> Option<&ScratchValue> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: ScratchValue) {
        self.values.insert(key.to_string(), value);
    }

    /// A missing or non-flag entry reads as `false`
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(ScratchValue::Flag(true)))
    }

    pub fn values(&self, key: &str) -> Option<&[f32]> {
        match self.values.get(key) {
            Some(ScratchValue::Values(v)) => Some(v),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ScratchValue> {
        self.values.remove(key)
    }
}

/// One-shot geometry drawn once with the scene's overlay style
#[derive(Debug, Clone)]
pub struct TemporaryGeometry {
    pub geometry: FlatGeometry,
    pub model_matrix: Matrix4<f32>,
    pub draw_mode: DrawMode,
}

impl TemporaryGeometry {
    pub fn new(geometry: FlatGeometry, model_matrix: Matrix4<f32>) -> Self {
        Self {
            geometry,
            model_matrix,
            draw_mode: DrawMode::Triangles,
        }
    }
}

/// A renderable scene node
pub struct Drawable {
    pub label: Option<String>,
    pub group_label: Option<String>,

    /// World-space translation
    pub pos: Vector3<f32>,
    /// World-space Euler angles (radians)
    pub orientation: Vector3<f32>,
    /// Transient orientation override, e.g. a tracked pose
    pub current_orientation: Option<Vector3<f32>>,
    /// Model-space Euler angles (radians)
    pub rotation: Vector3<f32>,
    /// Model-space translation
    pub translation: Vector3<f32>,
    pub scale: Scale,

    /// Injected transform, e.g. written by a tracking behaviour
    pub matrix: Option<Matrix4<f32>>,
    /// Injected transform handed to children when `matrix` is unset
    pub injected_matrix: Option<Matrix4<f32>>,
    /// Set by graph traversal before the node's own matrix is resolved
    pub inherited_matrix: Option<Matrix4<f32>>,

    pub animation: Option<Animation>,
    pub attributes: RenderAttributes,
    pub faces: IndexMap<String, FaceSpec>,

    /// Temporarily suppressed
    pub hidden: bool,
    /// Structurally unrenderable, e.g. containers
    pub invisible: bool,

    pub behaviours: Vec<Behaviour>,
    interactions: HashMap<String, InteractionHandler>,
    pub scratch_pad: ScratchPad,
    pub metadata: Metadata,
    pub latest_moment: Option<TimePoint>,

    pub mesh: Option<Rc<Mesh>>,
    pub bounds: Option<Bounds>,
    pub temporary_geometry: Vec<TemporaryGeometry>,

    shape: Box<dyn Shape>,
    container: bool,
    pub(crate) children: Vec<Drawable>,

    pub(crate) buffers: Option<GeometryBuffers>,
    pub(crate) mesh_buffers: Option<MeshBuffers>,
    pub(crate) prepared_faces: Vec<Face>,
    pub(crate) resolved_matrix: Option<Matrix4<f32>>,
    pub(crate) prepared: bool,
}

impl Drawable {
    /// Creates a drawable at `pos` from a shape
    pub fn new(shape: impl Shape + 'static, pos: Vector3<f32>) -> Self {
        let mesh = shape.mesh();
        let scale = shape.scale_factor().map(Scale::Uniform).unwrap_or_default();
        Self {
            label: None,
            group_label: None,
            pos,
            orientation: Vector3::zero(),
            current_orientation: None,
            rotation: Vector3::zero(),
            translation: Vector3::zero(),
            scale,
            matrix: None,
            injected_matrix: None,
            inherited_matrix: None,
            animation: None,
            attributes: RenderAttributes::default(),
            faces: IndexMap::new(),
            hidden: false,
            invisible: false,
            behaviours: Vec::new(),
            interactions: HashMap::new(),
            scratch_pad: ScratchPad::default(),
            metadata: Metadata::new(),
            latest_moment: None,
            mesh,
            bounds: None,
            temporary_geometry: Vec::new(),
            shape: Box::new(shape),
            container: false,
            children: Vec::new(),
            buffers: None,
            mesh_buffers: None,
            prepared_faces: Vec::new(),
            resolved_matrix: None,
            prepared: false,
        }
    }

    /// Creates an invisible node that only groups children
    pub fn container(pos: Vector3<f32>) -> Self {
        let mut container = Self::new(ContainerShape, pos);
        container.invisible = true;
        container.container = true;
        container
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_group_label(mut self, label: &str) -> Self {
        self.group_label = Some(label.to_string());
        self
    }

    pub fn with_orientation(mut self, orientation: Vector3<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_rotation(mut self, rotation: Vector3<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_translation(mut self, translation: Vector3<f32>) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_scale_factor(mut self, factor: f32) -> Self {
        self.scale = Scale::Uniform(factor);
        self
    }

    pub fn with_scale_factors(mut self, factors: Vector3<f32>) -> Self {
        self.scale = Scale::PerAxis(factors);
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.attributes.texture = Some(texture);
        self
    }

    pub fn with_texture_label(mut self, label: &str) -> Self {
        self.attributes.texture_label = Some(label.to_string());
        self
    }

    /// Per-eye textures override everything else during that eye's pass
    pub fn with_eye_textures(mut self, left: TextureId, right: TextureId) -> Self {
        self.attributes.left_eye_texture = Some(left);
        self.attributes.right_eye_texture = Some(right);
        self
    }

    pub fn with_texture_loader(mut self, loader: TextureLoader) -> Self {
        self.attributes.texture_loader = Some(loader);
        self
    }

    pub fn with_shader(mut self, shader: ShaderId) -> Self {
        self.attributes.shader = Some(shader);
        self
    }

    pub fn with_shader_label(mut self, label: &str) -> Self {
        self.attributes.shader_label = Some(label.to_string());
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.attributes.material = Some(material);
        self
    }

    pub fn with_material_label(mut self, label: &str) -> Self {
        self.attributes.material_label = Some(label.to_string());
        self
    }

    pub fn with_draw_mode(mut self, mode: DrawMode) -> Self {
        self.attributes.draw_mode = mode;
        self
    }

    pub fn with_mesh(mut self, mesh: Rc<Mesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Authored overrides for a face the shape divulges
    pub fn with_face(mut self, name: &str, face: FaceSpec) -> Self {
        self.faces.insert(name.to_string(), face);
        self
    }

    pub fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviours.push(behaviour);
        self
    }

    pub fn with_interaction(mut self, kind: &str, handler: InteractionHandler) -> Self {
        self.interactions.insert(kind.to_string(), handler);
        self
    }

    pub fn shape(&self) -> &dyn Shape {
        self.shape.as_ref()
    }

    /// Replaces the shape. Buffers are rebuilt the next time the node is
    /// prepared or rendered.
    pub fn set_shape(&mut self, shape: impl Shape + 'static) {
        self.mesh = shape.mesh().or_else(|| self.mesh.take());
        self.shape = Box::new(shape);
        self.prepared = false;
    }

    /// Authored face overrides, created on first access
    pub fn face_spec_mut(&mut self, name: &str) -> &mut FaceSpec {
        self.faces.entry(name.to_string()).or_default()
    }

    /// Faces resolved when the object was last prepared
    pub fn faces(&self) -> &[Face] {
        &self.prepared_faces
    }

    pub fn face(&self, name: &str) -> Option<&Face> {
        self.prepared_faces.iter().find(|face| face.name == name)
    }

    pub fn face_mut(&mut self, name: &str) -> Option<&mut Face> {
        self.prepared_faces.iter_mut().find(|face| face.name == name)
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn is_container(&self) -> bool {
        self.container
    }

    pub fn children(&self) -> &[Drawable] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Drawable] {
        &mut self.children
    }

    /// Nests `child` under this node, making it a graph root
    pub fn add_child(&mut self, child: Drawable) {
        self.container = true;
        self.children.push(child);
    }

    pub fn scale_factor(&self) -> Option<f32> {
        self.scale.factor()
    }

    /// Matrix resolved for this node during the most recent graph traversal
    pub fn resolved_matrix(&self) -> Option<Matrix4<f32>> {
        self.resolved_matrix
    }

    /// Not hidden, not invisible, and backed by geometry or a mesh
    pub fn can_render(&self) -> bool {
        !(self.hidden || self.invisible)
            && (self.buffers.is_some() || self.mesh_buffers.is_some() || !self.prepared_faces.is_empty())
    }

    pub fn relocate_to(&mut self, pos: Vector3<f32>) {
        self.pos = pos;
    }

    /// Tweens from the current position to `pos` with the default ease
    pub fn animate_to_position(&mut self, pos: Vector3<f32>, duration_ms: f64, now: TimePoint) {
        self.animate_to_position_with(pos, duration_ms, now, make_easing_function(3.0));
    }

    pub fn animate_to_position_with(
        &mut self,
        pos: Vector3<f32>,
        duration_ms: f64,
        now: TimePoint,
        timing: TimingFunction,
    ) {
        self.animation = Some(Animation {
            start_pos: self.pos,
            start_time: now,
            end_pos: pos,
            end_time: now + duration_ms,
            timing,
        });
    }

    /// Composes this node's transform at `now`.
    ///
    /// An expired animation is finalised here, after its interpolated
    /// position has been used for this call.
    pub fn transformation_matrix(&mut self, now: TimePoint, force: bool) -> Matrix4<f32> {
        if let (Some(matrix), false) = (self.matrix, force) {
            return match self.scale {
                Scale::Uniform(s) => matrix * Matrix4::from_scale(s),
                _ => matrix,
            };
        }

        let pos = match &self.animation {
            Some(animation) => {
                let pos = animation.position_at(now);
                if animation.is_expired(now) {
                    self.pos = animation.end_pos;
                    self.animation = None;
                }
                pos
            }
            None => self.pos,
        };

        let orientation = self.current_orientation.unwrap_or(self.orientation);
        let rotation = euler_quaternion(self.rotation.x, self.rotation.y, self.rotation.z)
            * euler_quaternion(orientation.x, orientation.y, orientation.z);
        let local = rotation_translation_scale(rotation, pos + self.translation, self.scale.vector());

        match self.inherited_matrix {
            Some(inherited) => inherited * local,
            None => local,
        }
    }

    /// Runs behaviours in order, then those of any children
    pub fn advance_simulation(&mut self, now: TimePoint, context: &BehaviourContext) {
        let mut behaviours = std::mem::take(&mut self.behaviours);
        for behaviour in behaviours.iter_mut() {
            behaviour(self, now, context);
            self.latest_moment = Some(now);
        }
        // Behaviours may register further behaviours while running
        behaviours.append(&mut self.behaviours);
        self.behaviours = behaviours;

        for child in self.children.iter_mut() {
            child.advance_simulation(now, context);
        }
    }

    /// Dispatches an interaction (`select`, `grab`, ...) to its handler.
    ///
    /// Returns `false` when no handler is registered for `kind`.
    pub fn interact(&mut self, kind: &str, params: &Metadata) -> bool {
        match self.interactions.remove(kind) {
            Some(mut handler) => {
                handler(self, params);
                self.interactions.entry(kind.to_string()).or_insert(handler);
                true
            }
            None => false,
        }
    }

    pub fn has_interaction(&self, kind: &str) -> bool {
        self.interactions.contains_key(kind)
    }

    /// Queues geometry to be drawn once, on the next render of this node
    pub fn push_temporary_geometry(&mut self, geometry: TemporaryGeometry) {
        self.temporary_geometry.push(geometry);
    }
}

impl fmt::Debug for Drawable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drawable")
            .field("label", &self.label)
            .field("group_label", &self.group_label)
            .field("pos", &self.pos)
            .field("orientation", &self.orientation)
            .field("scale", &self.scale)
            .field("shape", &self.shape)
            .field("hidden", &self.hidden)
            .field("invisible", &self.invisible)
            .field("behaviours", &self.behaviours.len())
            .field("children", &self.children)
            .field("prepared", &self.prepared)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::SimpleCuboid;
    use crate::gfx::math::matrices_close;
    use cgmath::{Point3, SquareMatrix, Transform};
    use rand::Rng;

    fn cube() -> Drawable {
        Drawable::new(SimpleCuboid::new(1.0, 1.0, 1.0), Vector3::new(0.0, 0.0, 0.0))
    }

    fn context_free<F: FnOnce(&BehaviourContext)>(f: F) {
        let stage = StageParameters::default();
        let context = BehaviourContext {
            devices: &[],
            stage: &stage,
            player_location: Vector3::zero(),
        };
        f(&context);
    }

    fn translation_of(m: &Matrix4<f32>) -> Vector3<f32> {
        m.w.truncate()
    }

    #[test]
    fn test_composition_is_pure_and_idempotent() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let mut v = || Vector3::new(rng.random_range(-3.0..3.0), rng.random_range(-3.0..3.0), rng.random_range(-3.0..3.0));
            let mut d = cube()
                .with_rotation(v())
                .with_orientation(v())
                .with_translation(v());
            d.pos = v();

            let expected = rotation_translation_scale(
                euler_quaternion(d.rotation.x, d.rotation.y, d.rotation.z)
                    * euler_quaternion(d.orientation.x, d.orientation.y, d.orientation.z),
                d.pos + d.translation,
                Vector3::new(1.0, 1.0, 1.0),
            );
            let first = d.transformation_matrix(0.0, false);
            let second = d.transformation_matrix(1000.0, false);
            assert!(matrices_close(&first, &expected, 1e-5));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_translation_sums_world_and_model() {
        let mut d = cube().with_translation(Vector3::new(0.0, 1.0, 0.0));
        d.pos = Vector3::new(2.0, 0.0, 0.0);
        let m = d.transformation_matrix(0.0, false);
        assert_eq!(translation_of(&m), Vector3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_current_orientation_overrides() {
        let mut d = cube().with_orientation(Vector3::new(0.0, 1.0, 0.0));
        let plain = d.transformation_matrix(0.0, false);
        d.current_orientation = Some(Vector3::zero());
        let overridden = d.transformation_matrix(0.0, false);
        assert_ne!(plain, overridden);
        assert!(matrices_close(&overridden, &Matrix4::identity(), 1e-6));
    }

    #[test]
    fn test_injected_matrix_with_scale_factor() {
        let mut d = cube().with_scale_factor(2.0);
        d.matrix = Some(Matrix4::identity());
        assert_eq!(d.transformation_matrix(0.0, false), Matrix4::from_scale(2.0));

        // Forced recompute ignores the injected matrix
        d.pos = Vector3::new(1.0, 0.0, 0.0);
        let forced = d.transformation_matrix(0.0, true);
        assert_eq!(translation_of(&forced), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_injected_matrix_without_uniform_scale_is_returned_unchanged() {
        let injected = Matrix4::from_translation(Vector3::new(0.0, 5.0, 0.0));
        let mut d = cube().with_scale_factors(Vector3::new(2.0, 3.0, 4.0));
        d.matrix = Some(injected);
        assert_eq!(d.transformation_matrix(0.0, false), injected);
    }

    #[test]
    fn test_inherited_matrix_left_multiplies() {
        let mut d = cube().with_orientation(Vector3::new(0.3, 0.2, 0.1));
        d.pos = Vector3::new(1.0, 2.0, 3.0);
        let previous = d.transformation_matrix(0.0, false);

        let inherited = Matrix4::from_translation(Vector3::new(-4.0, 0.0, 1.0)) * Matrix4::from_angle_y(cgmath::Rad(0.7));
        d.inherited_matrix = Some(inherited);
        let composed = d.transformation_matrix(0.0, false);
        assert!(matrices_close(&composed, &(inherited * previous), 1e-5));
    }

    #[test]
    fn test_animation_endpoints_and_finalise() {
        let mut d = cube();
        d.animate_to_position(Vector3::new(10.0, 0.0, 0.0), 1000.0, 500.0);

        let start = d.transformation_matrix(500.0, false);
        assert!((translation_of(&start) - Vector3::zero()).x.abs() < 1e-6);

        let mid = d.transformation_matrix(1000.0, false);
        assert!((translation_of(&mid).x - 5.0).abs() < 1e-4);
        assert!(d.animation.is_some());

        // At exactly end_time the animation is not yet expired
        let end = d.transformation_matrix(1500.0, false);
        assert!((translation_of(&end).x - 10.0).abs() < 1e-5);
        assert!(d.animation.is_some());

        let after = d.transformation_matrix(1501.0, false);
        assert!((translation_of(&after).x - 10.0).abs() < 1e-5);
        assert!(d.animation.is_none());
        assert_eq!(d.pos, Vector3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_animation_progress_is_monotonic() {
        let mut d = cube();
        d.animate_to_position(Vector3::new(0.0, 4.0, 0.0), 100.0, 0.0);
        let mut last = -1.0;
        for step in 0..=100 {
            let y = translation_of(&d.transformation_matrix(step as f64, false)).y;
            assert!(y > last, "step {} went from {} to {}", step, last, y);
            last = y;
        }
    }

    #[test]
    fn test_easing_function_shape() {
        let ease = make_easing_function(3.0);
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(1.0), 1.0);
        assert!((ease(0.5) - 0.5).abs() < 1e-6);
        assert!(ease(0.25) < 0.25);
        assert!(ease(0.75) > 0.75);
    }

    #[test]
    fn test_behaviours_run_in_order_with_children() {
        let mut parent = Drawable::container(Vector3::zero())
            .with_behaviour(Box::new(|d, _, _| d.pos.x += 1.0))
            .with_behaviour(Box::new(|d, _, _| d.pos.x *= 10.0));
        parent.add_child(cube().with_behaviour(Box::new(|d, now, _| d.pos.y = now as f32)));

        context_free(|context| parent.advance_simulation(42.0, context));
        assert_eq!(parent.pos.x, 10.0);
        assert_eq!(parent.latest_moment, Some(42.0));
        assert_eq!(parent.children()[0].pos.y, 42.0);
        assert_eq!(parent.behaviours.len(), 2);
    }

    #[test]
    fn test_interact_dispatches_by_kind() {
        let mut d = cube().with_interaction(
            "select",
            Box::new(|d, params| {
                d.scratch_pad
                    .set("selected", ScratchValue::Text(params.get("by").cloned().unwrap_or_default()));
            }),
        );
        let mut params = Metadata::new();
        params.insert("by".to_string(), "left hand".to_string());

        assert!(d.interact("select", &params));
        assert!(!d.interact("grab", &params));
        assert_eq!(d.scratch_pad.get("selected"), Some(&ScratchValue::Text("left hand".to_string())));
        assert!(d.has_interaction("select"));
    }

    #[test]
    fn test_container_is_invisible_graph_root() {
        let mut c = Drawable::container(Vector3::new(0.0, 1.0, 0.0));
        assert!(c.invisible && c.is_container());
        assert!(!c.can_render());
        c.add_child(cube());
        assert_eq!(c.children().len(), 1);

        let p = c.transformation_matrix(0.0, false).transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_eq!(p, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_render_attributes_fallback() {
        let parent = RenderAttributes {
            texture_label: Some("silver".to_string()),
            shader_label: Some("basic".to_string()),
            ..Default::default()
        };
        let face = RenderAttributes {
            texture_label: Some("gold".to_string()),
            ..Default::default()
        };
        let resolved = face.or(&parent);
        assert_eq!(resolved.texture_label.as_deref(), Some("gold"));
        assert_eq!(resolved.shader_label.as_deref(), Some("basic"));
        assert!(resolved.material.is_none());
    }
}
