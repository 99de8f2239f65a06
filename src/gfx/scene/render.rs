//! Per-frame render dispatch.
//!
//! Each render call walks the optional scene graph and then the object list.
//! Every drawable surface (a node's own buffers or one of its faces) resolves
//! its texture, shader and material through fixed fallback chains. The first
//! populated source wins; if that source is a label not yet installed the
//! surface is skipped for this frame.
//!
//! At most one deferred texture loader runs per render call, and only once
//! the configured interval has passed since the previous one.

use std::ops::AddAssign;

use cgmath::{Matrix4, SquareMatrix};

use crate::error::SceneError;
use crate::gfx::geometry::{NORMAL_OFFSET, TEXCOORD_OFFSET, VERTEX_STRIDE};
use crate::gfx::gpu::{BufferTarget, DrawMode, GpuContext, ShaderId, TextureId, VertexAttrib};
use crate::gfx::math::normal_matrix;
use crate::gfx::resources::{Material, ResourceTables};
use crate::time::TimePoint;

use super::container::SceneObject;
use super::drawable::{BehaviourContext, Drawable, RenderAttributes};
use super::face::{GeometryBuffers, MeshBuffers};
use super::scene::{prepare_drawable, Scene};

/// Point of view naming the left eye of a stereo pair
pub const LEFT_EYE: &str = "left_eye";
/// Point of view naming the right eye of a stereo pair
pub const RIGHT_EYE: &str = "right_eye";

/// Counters for one or more render calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub skipped_missing_texture: u32,
    pub skipped_missing_shader: u32,
    pub deferred_texture_loads: u32,
    pub temporary_draws: u32,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        self.draw_calls += other.draw_calls;
        self.skipped_missing_texture += other.skipped_missing_texture;
        self.skipped_missing_shader += other.skipped_missing_shader;
        self.deferred_texture_loads += other.deferred_texture_loads;
        self.temporary_draws += other.temporary_draws;
    }
}

/// One view of a frame: a viewport rectangle with its camera
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub pov: String,
}

struct RenderPass<'a> {
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
    pov: &'a str,
    now: TimePoint,
    loaded_texture: bool,
    last_texture_load: TimePoint,
    stats: RenderStats,
}

#[derive(Clone, Copy)]
enum Surface {
    Mesh(MeshBuffers),
    Inline(GeometryBuffers),
}

/// Shader sources consulted after a node's own and its material's
struct ShaderFallbacks<'a> {
    shader: Option<ShaderId>,
    label: Option<&'a str>,
    program: Option<ShaderId>,
}

fn resolve_material<'a>(attrs: &'a RenderAttributes, resources: &'a ResourceTables) -> Option<&'a Material> {
    match (&attrs.material, &attrs.material_label) {
        (Some(material), _) => Some(material),
        (None, Some(label)) => resources.material(label),
        (None, None) => None,
    }
}

fn resolve_texture(
    attrs: &RenderAttributes,
    material: Option<&Material>,
    resources: &ResourceTables,
    pov: &str,
) -> Option<TextureId> {
    if pov == LEFT_EYE && attrs.left_eye_texture.is_some() {
        return attrs.left_eye_texture;
    }
    if pov == RIGHT_EYE && attrs.right_eye_texture.is_some() {
        return attrs.right_eye_texture;
    }
    if attrs.texture.is_some() {
        return attrs.texture;
    }
    if let Some(label) = &attrs.texture_label {
        return resources.texture(label);
    }
    let material = material?;
    if material.texture.is_some() {
        return material.texture;
    }
    material.texture_label.as_deref().and_then(|label| resources.texture(label))
}

fn resolve_shader(
    attrs: &RenderAttributes,
    material: Option<&Material>,
    resources: &ResourceTables,
    fallbacks: &ShaderFallbacks,
) -> Option<ShaderId> {
    if let Some(label) = &attrs.shader_label {
        return resources.shader(label);
    }
    if attrs.shader.is_some() {
        return attrs.shader;
    }
    if let Some(label) = &attrs.legacy_shader_label {
        return resources.shader(label);
    }
    if let Some(material) = material {
        if material.shader.is_some() {
            return material.shader;
        }
        if let Some(label) = &material.shader_label {
            return resources.shader(label);
        }
    }
    if fallbacks.shader.is_some() {
        return fallbacks.shader;
    }
    if let Some(label) = fallbacks.label {
        return resources.shader(label);
    }
    fallbacks.program
}

fn bind_interleaved<G: GpuContext + ?Sized>(gpu: &mut G, buffers: &GeometryBuffers) {
    gpu.bind_buffer(BufferTarget::Array, buffers.vertex);
    gpu.bind_buffer(BufferTarget::ElementArray, buffers.index);
    gpu.enable_attrib(VertexAttrib::Position);
    gpu.enable_attrib(VertexAttrib::TexCoord);
    gpu.enable_attrib(VertexAttrib::VertexNormal);
    gpu.vertex_attrib_pointer(VertexAttrib::Position, 3, VERTEX_STRIDE, 0);
    gpu.vertex_attrib_pointer(VertexAttrib::TexCoord, 2, VERTEX_STRIDE, TEXCOORD_OFFSET);
    gpu.vertex_attrib_pointer(VertexAttrib::VertexNormal, 3, VERTEX_STRIDE, NORMAL_OFFSET);
}

impl<G: GpuContext> Scene<G> {
    /// Runs behaviours once, then renders each view into its viewport
    pub fn render_views(&mut self, views: &[Viewport]) -> RenderStats {
        let now = self.clock.now();
        self.advance_simulation(now);

        let mut total = RenderStats::default();
        for view in views {
            if self.context_lost {
                break;
            }
            self.gpu.viewport(view.x, view.y, view.width, view.height);
            total += self.render(&view.projection, &view.view, &view.pov);
        }
        total
    }

    /// Ticks behaviours of every node, graph root included.
    ///
    /// Devices are polled once and shared by all behaviours of the tick.
    pub fn advance_simulation(&mut self, now: TimePoint) {
        if !self.check_context() {
            return;
        }
        self.install_loaded_assets();

        let devices = self
            .devices
            .as_ref()
            .map(|source| source.tracked_devices())
            .unwrap_or_default();
        let context = BehaviourContext {
            devices: &devices,
            stage: &self.stage,
            player_location: self.player_location,
        };
        if let Some(root) = self.scene_graph.as_mut() {
            root.advance_simulation(now, &context);
        }
        for (_, object) in self.objects.iter_mut() {
            object.drawable_mut().advance_simulation(now, &context);
        }
    }

    /// Draws the scene graph and all top-level objects for one eye or view.
    ///
    /// Behaviours are not run here. Call [`Scene::advance_simulation`] once
    /// per frame before the per-eye renders, or use [`Scene::render_views`],
    /// which does both.
    pub fn render(&mut self, projection: &Matrix4<f32>, view: &Matrix4<f32>, pov: &str) -> RenderStats {
        if !self.check_context() {
            return RenderStats::default();
        }
        self.install_loaded_assets();
        self.update_spatial_state();

        let mut pass = RenderPass {
            projection: *projection,
            view: *view,
            pov,
            now: self.clock.now(),
            loaded_texture: false,
            last_texture_load: self.last_texture_load,
            stats: RenderStats::default(),
        };

        if let Some(mut root) = self.scene_graph.take() {
            self.consume_graph_node(None, &mut root, false, &mut pass);
            self.scene_graph = Some(root);
        }

        let mut objects = std::mem::take(&mut self.objects);
        for (_, object) in objects.iter_mut() {
            self.render_object(object, &mut pass);
        }
        self.objects = objects;

        self.last_texture_load = pass.last_texture_load;
        pass.stats
    }

    /// Returns false once the context is gone, reporting the loss once
    fn check_context(&mut self) -> bool {
        if self.context_lost {
            return false;
        }
        if !self.gpu.is_context_lost() {
            return true;
        }
        self.context_lost = true;
        let error = SceneError::ContextLost;
        log::error!("{}, rendering stopped", error);
        if let Some(callback) = self.on_context_lost.as_mut() {
            callback(&error);
        }
        false
    }

    fn update_spatial_state(&mut self) {
        if !self.spatial.take_turn() {
            return;
        }
        let Some(source) = self.devices.as_ref() else {
            return;
        };
        let devices = source.tracked_devices();
        let head = source.head_pose();
        self.spatial
            .refresh(&devices, head.as_ref(), &self.stage, self.player_location);
    }

    fn render_object(&mut self, object: &mut SceneObject, pass: &mut RenderPass) {
        let drawable = match object {
            SceneObject::Drawable(drawable) => drawable,
            SceneObject::Component(component) => {
                // A component's drawable always hangs off the component
                let parent = component.parent_matrix();
                self.consume_graph_node(parent, &mut component.drawable, true, pass);
                return;
            }
        };
        if drawable.is_container() {
            self.consume_graph_node(None, drawable, false, pass);
            return;
        }
        self.ensure_prepared(drawable);

        let model = drawable.transformation_matrix(pass.now, false);
        self.render_temporary_geometry(drawable, pass);
        if drawable.can_render() {
            self.render_node(drawable, &model, pass);
        }
    }

    /// Rebuilds buffers of a node whose shape changed since it was prepared
    fn ensure_prepared(&mut self, node: &mut Drawable) {
        if !node.is_prepared() {
            log::debug!("Rebuilding buffers of {:?}", node.label);
            prepare_drawable(&mut self.gpu, node);
        }
    }

    /// Depth-first graph walk. Each child inherits its parent's resolved
    /// matrix and is always recomputed; a root inherits its injected matrix,
    /// or identity, and keeps a matrix written by its behaviours unless
    /// `force` is set.
    fn consume_graph_node(
        &mut self,
        parent: Option<Matrix4<f32>>,
        node: &mut Drawable,
        force: bool,
        pass: &mut RenderPass,
    ) {
        self.ensure_prepared(node);
        node.inherited_matrix = Some(
            parent
                .or(node.injected_matrix)
                .unwrap_or_else(Matrix4::identity),
        );
        let resolved = node.transformation_matrix(pass.now, force);
        node.resolved_matrix = Some(resolved);

        for child in node.children.iter_mut() {
            self.consume_graph_node(Some(resolved), child, true, pass);
        }

        self.render_temporary_geometry(node, pass);
        if node.can_render() {
            self.render_node(node, &resolved, pass);
        }
    }

    /// Draws a node's own surface, then each of its faces with the node's
    /// model matrix.
    fn render_node(&mut self, node: &mut Drawable, model: &Matrix4<f32>, pass: &mut RenderPass) {
        let scale = node.scale_factor();
        let surface = match (node.mesh_buffers, node.buffers) {
            (Some(mesh), _) => Some(Surface::Mesh(mesh)),
            (None, Some(buffers)) => Some(Surface::Inline(buffers)),
            (None, None) => None,
        };
        if let Some(surface) = surface {
            self.draw_surface(&mut node.attributes, surface, model, scale, pass);
        }

        for face in node.prepared_faces.iter_mut() {
            if face.no_texture {
                pass.stats.skipped_missing_texture += 1;
                continue;
            }
            self.draw_surface(&mut face.attributes, Surface::Inline(face.buffers), model, scale, pass);
        }
    }

    fn draw_surface(
        &mut self,
        attrs: &mut RenderAttributes,
        surface: Surface,
        model: &Matrix4<f32>,
        scale: Option<f32>,
        pass: &mut RenderPass,
    ) {
        if !pass.loaded_texture
            && attrs.texture_loader.is_some()
            && pass.now - pass.last_texture_load > self.config.texture_load_interval_ms
        {
            if let Some(loader) = attrs.texture_loader.take() {
                let image = loader();
                attrs.texture = Some(self.gpu.create_texture(&image));
                pass.loaded_texture = true;
                pass.last_texture_load = pass.now;
                pass.stats.deferred_texture_loads += 1;
                return;
            }
        }

        let material = resolve_material(attrs, &self.resources);
        let Some(texture) = resolve_texture(attrs, material, &self.resources, pass.pov) else {
            pass.stats.skipped_missing_texture += 1;
            return;
        };
        let fallbacks = ShaderFallbacks {
            shader: self.default_shader,
            label: self.config.default_shader_label.as_deref(),
            program: self.fallback_program,
        };
        let Some(shader) = resolve_shader(attrs, material, &self.resources, &fallbacks) else {
            pass.stats.skipped_missing_shader += 1;
            return;
        };

        self.gpu.bind_texture(texture);
        self.gpu.use_program(shader);
        if let Some(material) = material {
            material.bind(&mut self.gpu);
        }

        let model_view = pass.view * model;
        self.gpu.set_uniform_mat4("projectionMat", &pass.projection);
        self.gpu.set_uniform_mat4("modelMat", model);
        self.gpu.set_uniform_mat4("modelViewMat", &model_view);
        self.gpu.set_uniform_mat4("normalMat", &normal_matrix(model, scale));

        match surface {
            Surface::Mesh(buffers) => self.draw_mesh(&buffers, attrs.draw_mode),
            Surface::Inline(buffers) => self.draw_inline(&buffers, attrs.draw_mode),
        }
        pass.stats.draw_calls += 1;
    }

    fn draw_mesh(&mut self, buffers: &MeshBuffers, mode: DrawMode) {
        let gpu = &mut self.gpu;
        gpu.bind_buffer(BufferTarget::Array, buffers.vertex);
        gpu.vertex_attrib_pointer(VertexAttrib::Position, 3, 0, 0);
        gpu.enable_attrib(VertexAttrib::Position);

        if buffers.tex_coord_count > 0 {
            gpu.bind_buffer(BufferTarget::Array, buffers.tex_coord);
            gpu.vertex_attrib_pointer(VertexAttrib::TexCoord, 2, 0, 0);
            gpu.enable_attrib(VertexAttrib::TexCoord);
        } else {
            gpu.disable_attrib(VertexAttrib::TexCoord);
        }

        gpu.bind_buffer(BufferTarget::Array, buffers.normal);
        gpu.vertex_attrib_pointer(VertexAttrib::VertexNormal, 3, 0, 0);
        gpu.enable_attrib(VertexAttrib::VertexNormal);

        gpu.bind_buffer(BufferTarget::ElementArray, buffers.index);
        let count = match self.config.mesh_index_limit {
            Some(limit) => buffers.index_count.min(limit),
            None => buffers.index_count,
        };
        gpu.draw_indexed(mode, count);
    }

    fn draw_inline(&mut self, buffers: &GeometryBuffers, mode: DrawMode) {
        bind_interleaved(&mut self.gpu, buffers);
        self.gpu.set_uniform_i32("diffuse", 0);
        self.gpu.draw_indexed(mode, buffers.index_count);
    }

    /// Draws and discards geometry queued on `node` for this frame only
    fn render_temporary_geometry(&mut self, node: &mut Drawable, pass: &mut RenderPass) {
        if node.temporary_geometry.is_empty() {
            return;
        }
        let shader = self.resources.shader(&self.config.temporary_geometry_shader_label);
        let texture = self.resources.texture(&self.config.temporary_geometry_texture_label);
        let (Some(shader), Some(texture)) = (shader, texture) else {
            log::debug!(
                "Dropping {} temporary geometries: '{}' shader or '{}' texture not loaded",
                node.temporary_geometry.len(),
                self.config.temporary_geometry_shader_label,
                self.config.temporary_geometry_texture_label
            );
            node.temporary_geometry.clear();
            return;
        };

        for temporary in node.temporary_geometry.drain(..) {
            let buffers = GeometryBuffers::upload(&mut self.gpu, &temporary.geometry);
            self.gpu.bind_texture(texture);
            self.gpu.use_program(shader);
            self.gpu.set_uniform_mat4("projectionMat", &pass.projection);
            self.gpu
                .set_uniform_mat4("modelViewMat", &(pass.view * temporary.model_matrix));
            bind_interleaved(&mut self.gpu, &buffers);
            self.gpu.draw_indexed(temporary.draw_mode, buffers.index_count);
            buffers.delete(&mut self.gpu);
            pass.stats.temporary_draws += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::gfx::geometry::{BoardCuboid, FlatGeometry, MeshShape, SimpleCuboid, WallShape};
    use crate::gfx::gpu::{GpuCall, RecordingContext};
    use crate::gfx::math::matrices_close;
    use crate::gfx::mesh::Mesh;
    use crate::gfx::resources::TextureImage;
    use crate::gfx::scene::{Component, FaceSpec, TemporaryGeometry};
    use crate::input::{Pose, SharedDevices, TrackedDevice};
    use crate::time::ManualClock;
    use cgmath::{One, Quaternion, Vector3, Zero};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn scene_at(time: TimePoint, config: SceneConfig) -> (Scene<RecordingContext>, ManualClock) {
        let clock = ManualClock::new(time);
        let scene = Scene::with_config(RecordingContext::new(), config).with_clock(clock.clone());
        (scene, clock)
    }

    fn scene_with_basics() -> (Scene<RecordingContext>, ManualClock) {
        let (mut scene, clock) = scene_at(1000.0, SceneConfig::default());
        scene.add_texture("silver", TextureId(100));
        scene.add_texture("cyan", TextureId(101));
        scene.resources.shaders.insert("basic".to_string(), ShaderId(200));
        (scene, clock)
    }

    fn cube() -> Drawable {
        Drawable::new(SimpleCuboid::new(1.0, 1.0, 1.0), Vector3::zero())
            .with_texture_label("silver")
            .with_shader_label("basic")
    }

    fn identity() -> Matrix4<f32> {
        Matrix4::identity()
    }

    fn render(scene: &mut Scene<RecordingContext>) -> RenderStats {
        scene.render(&identity(), &identity(), LEFT_EYE)
    }

    fn loader(counter: &Rc<RefCell<u32>>) -> crate::gfx::scene::TextureLoader {
        let counter = counter.clone();
        Rc::new(move || {
            *counter.borrow_mut() += 1;
            TextureImage::solid([255, 0, 0, 255])
        })
    }

    #[test]
    fn test_renders_prepared_cube() {
        let (mut scene, _) = scene_with_basics();
        scene.add_object(cube());
        let stats = render(&mut scene);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(scene.gpu().textures_drawn(), vec![Some(TextureId(100))]);
        assert_eq!(scene.gpu().programs_drawn(), vec![Some(ShaderId(200))]);
        assert!(scene.gpu().calls.contains(&GpuCall::UniformI32("diffuse".to_string(), 0)));
    }

    #[test]
    fn test_missing_label_skips_without_fallthrough() {
        let (mut scene, _) = scene_with_basics();
        let material = Material::default().with_texture(TextureId(5));
        scene.add_object(cube().with_texture_label("not-yet-loaded").with_material(material));
        scene.add_object(cube().with_shader_label("missing"));

        let stats = render(&mut scene);
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.skipped_missing_texture, 1);
        assert_eq!(stats.skipped_missing_shader, 1);

        scene.add_texture("not-yet-loaded", TextureId(7));
        let stats = render(&mut scene);
        assert_eq!(stats.draw_calls, 1);
    }

    #[test]
    fn test_texture_fallback_order() {
        let resources = {
            let mut r = ResourceTables::new();
            r.textures.insert("label".to_string(), TextureId(2));
            r.textures.insert("mat".to_string(), TextureId(4));
            r
        };
        let material = Material::default().with_texture_label("mat");
        let mut attrs = RenderAttributes {
            left_eye_texture: Some(TextureId(10)),
            right_eye_texture: Some(TextureId(11)),
            texture: Some(TextureId(1)),
            texture_label: Some("label".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_texture(&attrs, Some(&material), &resources, LEFT_EYE), Some(TextureId(10)));
        assert_eq!(resolve_texture(&attrs, Some(&material), &resources, RIGHT_EYE), Some(TextureId(11)));
        assert_eq!(resolve_texture(&attrs, Some(&material), &resources, "mono"), Some(TextureId(1)));
        attrs.texture = None;
        assert_eq!(resolve_texture(&attrs, Some(&material), &resources, "mono"), Some(TextureId(2)));
        attrs.texture_label = None;
        assert_eq!(resolve_texture(&attrs, Some(&material), &resources, "mono"), Some(TextureId(4)));
        assert_eq!(resolve_texture(&attrs, None, &resources, "mono"), None);
    }

    #[test]
    fn test_shader_fallback_order() {
        let mut resources = ResourceTables::new();
        resources.shaders.insert("named".to_string(), ShaderId(1));
        resources.shaders.insert("default".to_string(), ShaderId(3));
        let fallbacks = ShaderFallbacks {
            shader: None,
            label: Some("default"),
            program: Some(ShaderId(9)),
        };
        let mut attrs = RenderAttributes {
            shader_label: Some("named".to_string()),
            shader: Some(ShaderId(2)),
            ..Default::default()
        };
        assert_eq!(resolve_shader(&attrs, None, &resources, &fallbacks), Some(ShaderId(1)));
        attrs.shader_label = None;
        assert_eq!(resolve_shader(&attrs, None, &resources, &fallbacks), Some(ShaderId(2)));
        attrs.shader = None;
        let material = Material::default().with_shader(ShaderId(5));
        assert_eq!(resolve_shader(&attrs, Some(&material), &resources, &fallbacks), Some(ShaderId(5)));
        assert_eq!(resolve_shader(&attrs, None, &resources, &fallbacks), Some(ShaderId(3)));

        let last_resort = ShaderFallbacks {
            shader: None,
            label: None,
            program: Some(ShaderId(9)),
        };
        assert_eq!(resolve_shader(&attrs, None, &resources, &last_resort), Some(ShaderId(9)));
    }

    #[test]
    fn test_texture_loads_are_throttled() {
        let (mut scene, clock) = scene_with_basics();
        let count = Rc::new(RefCell::new(0));
        let a = scene.add_object(cube().with_texture_loader(loader(&count)));
        let b = scene.add_object(cube().with_texture_loader(loader(&count)));

        let stats = render(&mut scene);
        assert_eq!(stats.deferred_texture_loads, 1);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(*count.borrow(), 1);
        let first = scene.drawable(a).unwrap();
        assert!(first.attributes.texture_loader.is_none());
        assert!(first.attributes.texture.is_some());

        // Too soon for the second loader
        clock.advance(50.0);
        let stats = render(&mut scene);
        assert_eq!(stats.deferred_texture_loads, 0);
        assert_eq!(stats.draw_calls, 2);

        clock.advance(51.0);
        let stats = render(&mut scene);
        assert_eq!(stats.deferred_texture_loads, 1);
        assert_eq!(*count.borrow(), 2);
        assert!(scene.drawable(b).unwrap().attributes.texture_loader.is_none());

        let stats = render(&mut scene);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_loader_interval_respects_config() {
        let (mut scene, clock) = scene_at(0.0, SceneConfig::default().with_texture_load_interval(10.0));
        scene.resources.shaders.insert("basic".to_string(), ShaderId(1));
        let count = Rc::new(RefCell::new(0));
        scene.add_object(cube().with_texture_loader(loader(&count)));
        render(&mut scene);
        assert_eq!(*count.borrow(), 0);
        clock.advance(11.0);
        render(&mut scene);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_untextured_face_never_renders() {
        let (mut scene, _) = scene_with_basics();
        scene.add_texture("gold", TextureId(102));
        let board = Drawable::new(BoardCuboid::new(2.0, 1.0, 0.2), Vector3::zero())
            .with_texture_label("silver")
            .with_shader_label("basic")
            .with_face("front", FaceSpec::new().with_texture_label("gold"))
            .with_face("caption", FaceSpec::untextured());
        scene.add_object(board);

        let stats = render(&mut scene);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.skipped_missing_texture, 1);
        let textures = scene.gpu().textures_drawn();
        assert!(textures.contains(&Some(TextureId(102))));
        assert!(textures.contains(&Some(TextureId(100))));
    }

    #[test]
    fn test_scale_uses_identity_when_not_injected() {
        let (mut scene, _) = scene_with_basics();
        scene.add_object(cube().with_scale_factor(2.0));
        render(&mut scene);
        let models = scene.gpu().mat4_uniforms("modelMat");
        assert!(matrices_close(&models[0], &Matrix4::from_scale(2.0), 1e-6));
        let normals = scene.gpu().mat4_uniforms("normalMat");
        assert!(matrices_close(&normals[0], &Matrix4::identity(), 1e-6));
    }

    #[test]
    fn test_injected_matrix_is_honoured() {
        let (mut scene, _) = scene_with_basics();
        let mut object = cube().with_scale_factor(2.0);
        object.matrix = Some(Matrix4::from_translation(Vector3::new(0.0, 3.0, 0.0)));
        scene.add_object(object);
        render(&mut scene);
        let expected = Matrix4::from_translation(Vector3::new(0.0, 3.0, 0.0)) * Matrix4::from_scale(2.0);
        let models = scene.gpu().mat4_uniforms("modelMat");
        assert!(matrices_close(&models[0], &expected, 1e-6));
    }

    #[test]
    fn test_mesh_without_texcoords_disables_attribute() {
        let (mut scene, _) = scene_at(1000.0, SceneConfig::default().with_mesh_index_limit(3));
        scene.add_texture("silver", TextureId(1));
        scene.resources.shaders.insert("basic".to_string(), ShaderId(2));
        let mesh = scene.add_mesh(
            "quad",
            Mesh::new(vec![0.0; 12], Vec::new(), vec![0.0; 12], vec![0, 1, 2, 0, 2, 3]),
        );
        scene.add_object(
            Drawable::new(MeshShape::new(mesh), Vector3::zero())
                .with_texture_label("silver")
                .with_shader_label("basic"),
        );
        render(&mut scene);
        assert!(scene.gpu().calls.contains(&GpuCall::DisableAttrib(VertexAttrib::TexCoord)));
        assert_eq!(scene.gpu().draws(), vec![(DrawMode::Triangles, 3)]);
    }

    #[test]
    fn test_graph_children_inherit_parent_matrix() {
        let (mut scene, _) = scene_with_basics();
        let mut root = Drawable::container(Vector3::new(1.0, 0.0, 0.0));
        root.add_child(cube().with_label("child").with_translation(Vector3::new(0.0, 2.0, 0.0)));
        scene.set_scene_graph(root);

        let stats = render(&mut scene);
        assert_eq!(stats.draw_calls, 1);
        let models = scene.gpu().mat4_uniforms("modelMat");
        let expected = Matrix4::from_translation(Vector3::new(1.0, 2.0, 0.0));
        assert!(matrices_close(&models[0], &expected, 1e-6));
        let child = &scene.scene_graph().unwrap().children()[0];
        assert!(matrices_close(&child.resolved_matrix().unwrap(), &expected, 1e-6));
    }

    #[test]
    fn test_component_matrix_is_inherited() {
        let (mut scene, _) = scene_with_basics();
        let mut component = Component::new(cube().with_translation(Vector3::new(0.0, 0.0, 1.0)));
        component.matrix = Some(Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0)));
        scene.add_object(component);
        render(&mut scene);
        let models = scene.gpu().mat4_uniforms("modelMat");
        let expected = Matrix4::from_translation(Vector3::new(5.0, 0.0, 1.0));
        assert!(matrices_close(&models[0], &expected, 1e-6));
    }

    #[test]
    fn test_component_matrix_reaches_container_children() {
        let (mut scene, _) = scene_with_basics();
        let mut group = Drawable::container(Vector3::zero());
        group.add_child(cube());
        let mut component = Component::new(group);
        component.matrix = Some(Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0)));
        // A stale matrix on the wrapped drawable is recomputed
        component.drawable.matrix = Some(Matrix4::from_translation(Vector3::new(0.0, 9.0, 0.0)));
        scene.add_object(component);

        assert_eq!(render(&mut scene).draw_calls, 1);
        let models = scene.gpu().mat4_uniforms("modelMat");
        let expected = Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(models.len(), 1);
        assert!(matrices_close(&models[0], &expected, 1e-6));
    }

    #[test]
    fn test_changed_shape_is_rebuilt_on_render() {
        let (mut scene, _) = scene_with_basics();
        let id = scene.add_object(cube());
        let old = scene.drawable_mut(id).unwrap().buffers.unwrap();

        scene
            .drawable_mut(id)
            .unwrap()
            .set_shape(WallShape::new(0.0, 1.0, 0.0, 1.0));
        assert!(!scene.drawable_mut(id).unwrap().is_prepared());

        assert_eq!(render(&mut scene).draw_calls, 1);
        let drawable = scene.drawable_mut(id).unwrap();
        assert!(drawable.is_prepared());
        let new = drawable.buffers.unwrap();
        assert_ne!(new.vertex, old.vertex);
        assert!(!scene.gpu().is_buffer_live(old.vertex));
        assert!(!scene.gpu().is_buffer_live(old.index));
        assert_eq!(scene.gpu().live_buffer_count(), 2);
    }

    #[test]
    fn test_changed_shape_of_graph_child_is_rebuilt() {
        let (mut scene, _) = scene_with_basics();
        let mut root = Drawable::container(Vector3::zero());
        root.add_child(cube());
        scene.set_scene_graph(root);
        assert_eq!(render(&mut scene).draw_calls, 1);

        let child = &mut scene.scene_graph_mut().unwrap().children_mut()[0];
        child.set_shape(WallShape::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(render(&mut scene).draw_calls, 1);
        assert!(scene.scene_graph_mut().unwrap().children()[0].is_prepared());
        assert_eq!(scene.gpu().live_buffer_count(), 2);
    }

    #[test]
    fn test_material_fallback_order() {
        let brass = Material::new([0.3, 0.2, 0.1], [0.6, 0.4, 0.2], [0.9, 0.9, 0.9]);
        let direct = Material::new([0.1, 0.1, 0.1], [0.5, 0.5, 0.5], [1.0, 1.0, 1.0]);
        let mut resources = ResourceTables::new();
        resources.materials.insert("brass".to_string(), brass.clone());

        let mut attrs = RenderAttributes {
            material: Some(direct.clone()),
            material_label: Some("brass".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_material(&attrs, &resources), Some(&direct));

        attrs.material = None;
        assert_eq!(resolve_material(&attrs, &resources), Some(&brass));

        attrs.material_label = Some("pewter".to_string());
        assert_eq!(resolve_material(&attrs, &resources), None);

        attrs.material_label = None;
        assert_eq!(resolve_material(&attrs, &resources), None);
    }

    #[test]
    fn test_material_uniforms_pushed_per_draw() {
        let (mut scene, _) = scene_with_basics();
        let material = Material::new([0.1, 0.2, 0.3], [0.4, 0.5, 0.6], [0.7, 0.8, 0.9]).with_shininess(12.0);
        scene.add_object(cube().with_material(material));
        scene.add_material("brass", Material::new([0.3, 0.2, 0.1], [0.6, 0.4, 0.2], [0.9, 0.9, 0.9]));
        scene.add_object(cube().with_material_label("brass"));

        assert_eq!(render(&mut scene).draw_calls, 2);
        let gpu = scene.gpu();
        assert_eq!(
            gpu.vec3_uniforms("material.Ambient"),
            vec![[0.1, 0.2, 0.3], [0.3, 0.2, 0.1]]
        );
        assert_eq!(
            gpu.vec3_uniforms("material.Diffuse"),
            vec![[0.4, 0.5, 0.6], [0.6, 0.4, 0.2]]
        );
        assert_eq!(
            gpu.vec3_uniforms("material.Specular"),
            vec![[0.7, 0.8, 0.9], [0.9, 0.9, 0.9]]
        );
        assert!(gpu
            .calls
            .contains(&GpuCall::UniformF32("material.Shininess".to_string(), 12.0)));
    }

    #[test]
    fn test_hidden_objects_are_skipped() {
        let (mut scene, _) = scene_with_basics();
        let id = scene.add_object(cube());
        scene.drawable_mut(id).unwrap().hidden = true;
        assert_eq!(render(&mut scene).draw_calls, 0);
    }

    #[test]
    fn test_temporary_geometry_drawn_once() {
        let (mut scene, _) = scene_with_basics();
        let id = scene.add_object(cube());
        let flat = FlatGeometry::new(vec![0.0; 24], vec![0, 1, 2]);
        scene
            .drawable_mut(id)
            .unwrap()
            .push_temporary_geometry(TemporaryGeometry::new(flat, Matrix4::identity()));

        let stats = render(&mut scene);
        assert_eq!(stats.temporary_draws, 1);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(scene.gpu().live_buffer_count(), 2);
        assert!(scene.drawable(id).unwrap().temporary_geometry.is_empty());
        assert_eq!(render(&mut scene).temporary_draws, 0);
    }

    #[test]
    fn test_context_loss_reported_once() {
        let (mut scene, _) = scene_with_basics();
        scene.add_object(cube());
        let reports = Rc::new(RefCell::new(0));
        let counter = reports.clone();
        scene.on_context_lost(move |error| {
            assert!(matches!(error, SceneError::ContextLost));
            *counter.borrow_mut() += 1;
        });

        scene.gpu_mut().set_context_lost(true);
        assert_eq!(render(&mut scene), RenderStats::default());
        assert_eq!(render(&mut scene), RenderStats::default());
        scene.advance_simulation(2000.0);
        assert_eq!(*reports.borrow(), 1);
        assert!(scene.is_context_lost());
        assert_eq!(scene.gpu().draw_count(), 0);
    }

    #[test]
    fn test_spatial_state_refreshes_every_other_call() {
        let (mut scene, _) = scene_with_basics();
        let devices = SharedDevices::new();
        scene.set_device_source(devices.clone());
        let device = |x: f32| TrackedDevice {
            pose: Pose::new(Vector3::new(x, 0.0, 0.0), Quaternion::one()),
            ..Default::default()
        };

        devices.set_devices(vec![device(1.0)]);
        render(&mut scene);
        let first = scene.spatial_state().hands[0].map(|h| h.position.x);
        assert_eq!(first, Some(1.0));

        devices.set_devices(vec![device(2.0)]);
        render(&mut scene);
        assert_eq!(scene.spatial_state().hands[0].map(|h| h.position.x), first);
        render(&mut scene);
        assert_eq!(scene.spatial_state().hands[0].map(|h| h.position.x), Some(2.0));
    }

    #[test]
    fn test_render_views_ticks_once() {
        let (mut scene, _) = scene_with_basics();
        let ticks = Rc::new(RefCell::new(0));
        let counter = ticks.clone();
        scene.add_object(cube().with_behaviour(Box::new(move |_, _, _| *counter.borrow_mut() += 1)));

        let view = |x, pov: &str| Viewport {
            x,
            y: 0,
            width: 100,
            height: 100,
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
            pov: pov.to_string(),
        };
        let stats = scene.render_views(&[view(0, LEFT_EYE), view(100, RIGHT_EYE)]);
        assert_eq!(*ticks.borrow(), 1);
        assert_eq!(stats.draw_calls, 2);
        assert!(scene.gpu().calls.contains(&GpuCall::Viewport {
            x: 100,
            y: 0,
            width: 100,
            height: 100
        }));
    }
}
