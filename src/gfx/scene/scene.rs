use std::rc::Rc;

use cgmath::{InnerSpace, One, Quaternion, Vector3, Zero};

use crate::config::SceneConfig;
use crate::error::{Result, SceneError};
use crate::gfx::geometry::{Bounds, ControllerShape, Geometry, GroundedCuboid};
use crate::gfx::gpu::{AttribLocations, GpuContext, ShaderId, TextureId};
use crate::gfx::math::rotation_translation;
use crate::gfx::mesh::Mesh;
use crate::gfx::resources::loader::{
    request_mesh, request_model_source, request_shader, request_texture,
};
use crate::gfx::resources::{
    asset_channel, bind_lights, AssetFetcher, AssetInbox, AssetSender, ColorSpec, FileFetcher,
    Light, LoadFuture, LoadedAsset, Material, Prerequisites, ResourceTables, TextureImage,
};
use crate::input::{make_gamepad_tracker, DeviceSource, Pose, StageParameters};
use crate::time::{Clock, SystemClock, TimePoint};

use super::container::{ObjectId, SceneObject};
use super::drawable::Drawable;
use super::face::{Face, GeometryBuffers, MeshBuffers};
use super::spatial::PlayerSpatialState;

/// Label the scene gives the floor object players stand on
pub const RAFT_LABEL: &str = "raft";

/// Distance from a point to a top-level object's position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectDistance {
    pub id: ObjectId,
    pub distance: f32,
}

/// Main scene: the object list, resource tables and render state.
///
/// Everything runs on the render thread. Asset loads happen elsewhere and
/// arrive through the asset channel, installed at the start of each frame.
pub struct Scene<G: GpuContext> {
    pub(crate) gpu: G,
    pub(crate) config: SceneConfig,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) objects: Vec<(ObjectId, SceneObject)>,
    pub(crate) scene_graph: Option<Drawable>,
    pub(crate) resources: ResourceTables,
    pub(crate) lights: Vec<Light>,
    pub(crate) stage: StageParameters,
    pub(crate) player_location: Vector3<f32>,
    pub(crate) spatial: PlayerSpatialState,
    pub(crate) devices: Option<Box<dyn DeviceSource>>,
    pub(crate) last_texture_load: TimePoint,
    pub(crate) default_shader: Option<ShaderId>,
    pub(crate) fallback_program: Option<ShaderId>,
    pub(crate) context_lost: bool,
    pub(crate) on_context_lost: Option<Box<dyn FnMut(&SceneError)>>,
    fetcher: Box<dyn AssetFetcher>,
    sender: AssetSender,
    inbox: AssetInbox,
    next_id: u64,
}

impl<G: GpuContext> Scene<G> {
    /// Creates a new scene with default configuration
    pub fn new(gpu: G) -> Self {
        Self::with_config(gpu, SceneConfig::default())
    }

    pub fn with_config(gpu: G, config: SceneConfig) -> Self {
        log::info!("Initialising scene...");
        let (sender, inbox) = asset_channel();
        Self {
            gpu,
            stage: StageParameters::seated(config.player_height),
            config,
            clock: Box::new(SystemClock),
            objects: Vec::new(),
            scene_graph: None,
            resources: ResourceTables::new(),
            lights: Vec::new(),
            player_location: Vector3::zero(),
            spatial: PlayerSpatialState::new(),
            devices: None,
            last_texture_load: 0.0,
            default_shader: None,
            fallback_program: None,
            context_lost: false,
            on_context_lost: None,
            fetcher: Box::new(FileFetcher::default()),
            sender,
            inbox,
            next_id: 0,
        }
    }

    /// Builder pattern: Read time from `clock`
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Builder pattern: Fetch assets through `fetcher`
    pub fn with_fetcher(mut self, fetcher: impl AssetFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn set_device_source(&mut self, source: impl DeviceSource + 'static) {
        self.devices = Some(Box::new(source));
    }

    pub fn set_stage_parameters(&mut self, stage: StageParameters) {
        self.stage = stage;
    }

    pub fn stage_parameters(&self) -> &StageParameters {
        &self.stage
    }

    /// Called once when the GPU context is found lost
    pub fn on_context_lost(&mut self, callback: impl FnMut(&SceneError) + 'static) {
        self.on_context_lost = Some(Box::new(callback));
    }

    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn resources(&self) -> &ResourceTables {
        &self.resources
    }

    pub fn now(&self) -> TimePoint {
        self.clock.now()
    }

    // Object list

    /// Prepares an object (children first) and appends it to the scene
    pub fn add_object(&mut self, object: impl Into<SceneObject>) -> ObjectId {
        let mut object = object.into();
        prepare_recursive(&mut self.gpu, object.drawable_mut());
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.push((id, object));
        id
    }

    pub fn add_objects<I, T>(&mut self, objects: I) -> Vec<ObjectId>
    where
        I: IntoIterator<Item = T>,
        T: Into<SceneObject>,
    {
        objects.into_iter().map(|object| self.add_object(object)).collect()
    }

    /// (Re)builds GPU buffers for one drawable, e.g. after its shape changed
    pub fn prepare_object(&mut self, drawable: &mut Drawable) {
        prepare_drawable(&mut self.gpu, drawable);
    }

    /// Re-prepares a top-level object in place
    pub fn rebuild_object(&mut self, id: ObjectId) -> bool {
        match self.objects.iter_mut().find(|(object_id, _)| *object_id == id) {
            Some((_, object)) => {
                prepare_recursive(&mut self.gpu, object.drawable_mut());
                true
            }
            None => false,
        }
    }

    /// Unlinks an object. With `expunge`, its GPU buffers are freed as well.
    ///
    /// Removing an object that is not in the scene logs and does nothing.
    pub fn remove_object(&mut self, id: ObjectId, expunge: bool) -> Option<SceneObject> {
        let Some(index) = self.objects.iter().position(|(object_id, _)| *object_id == id) else {
            log::info!("Scene cannot remove object {:?}: not in scene", id);
            return None;
        };
        let (_, mut object) = self.objects.remove(index);
        if expunge {
            release_recursive(&mut self.gpu, object.drawable_mut());
        }
        Some(object)
    }

    pub fn remove_objects(&mut self, ids: &[ObjectId]) -> usize {
        ids.iter()
            .filter_map(|id| self.remove_object(*id, false))
            .count()
    }

    pub fn remove_objects_in_group(&mut self, group_label: &str) -> usize {
        let ids = self.get_objects_in_group(group_label);
        self.remove_objects(&ids)
    }

    /// First top-level object with `label`
    pub fn get_object_by_label(&self, label: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.label() == Some(label))
            .map(|(id, _)| *id)
    }

    pub fn get_objects_in_group(&self, group_label: &str) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, object)| object.group_label() == Some(group_label))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Distance from `loc` to every top-level object passing `filter`
    pub fn get_object_distances_from(
        &self,
        loc: Vector3<f32>,
        filter: Option<&dyn Fn(&Drawable) -> bool>,
    ) -> Vec<ObjectDistance> {
        self.objects
            .iter()
            .filter(|(_, object)| filter.map_or(true, |f| f(object.drawable())))
            .map(|(id, object)| ObjectDistance {
                id: *id,
                distance: (object.pos() - loc).magnitude(),
            })
            .collect()
    }

    /// Nearest component to `loc`. Ties go to the later object.
    pub fn get_nearest_object_to_point(
        &self,
        loc: Vector3<f32>,
        filter: Option<&dyn Fn(&Drawable) -> bool>,
    ) -> Option<ObjectDistance> {
        let mut nearest: Option<ObjectDistance> = None;
        for candidate in self.get_object_distances_from(loc, filter) {
            if !self.object(candidate.id).is_some_and(SceneObject::is_component) {
                continue;
            }
            nearest = match nearest {
                Some(best) if candidate.distance > best.distance => Some(best),
                _ => Some(candidate),
            };
        }
        nearest
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find(|(object_id, _)| *object_id == id)
            .map(|(_, object)| object)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects
            .iter_mut()
            .find(|(object_id, _)| *object_id == id)
            .map(|(_, object)| object)
    }

    pub fn drawable(&self, id: ObjectId) -> Option<&Drawable> {
        self.object(id).map(SceneObject::drawable)
    }

    pub fn drawable_mut(&mut self, id: ObjectId) -> Option<&mut Drawable> {
        self.object_mut(id).map(SceneObject::drawable_mut)
    }

    /// Top-level objects in insertion order
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Installs a root drawable traversed before the object list
    pub fn set_scene_graph(&mut self, mut root: Drawable) {
        prepare_recursive(&mut self.gpu, &mut root);
        self.scene_graph = Some(root);
    }

    pub fn scene_graph(&self) -> Option<&Drawable> {
        self.scene_graph.as_ref()
    }

    pub fn scene_graph_mut(&mut self) -> Option<&mut Drawable> {
        self.scene_graph.as_mut()
    }

    // Textures

    pub fn add_texture(&mut self, label: &str, texture: TextureId) {
        self.resources.textures.insert(label.to_string(), texture);
    }

    /// Uploads raw pixels, registering them under `label` when given
    pub fn add_texture_from_canvas(&mut self, image: &TextureImage, label: Option<&str>) -> TextureId {
        let texture = self.gpu.create_texture(image);
        if let Some(label) = label {
            self.add_texture(label, texture);
        }
        texture
    }

    /// Uploads a 1x1 texture of a single colour
    pub fn add_texture_from_color(&mut self, color: &ColorSpec, label: &str) -> Result<TextureId> {
        let image = TextureImage::from_color(color)?;
        Ok(self.add_texture_from_canvas(&image, Some(label)))
    }

    /// Requests an encoded image; the texture appears once installed
    pub fn add_texture_from_image(&self, url: &str, label: &str) -> LoadFuture {
        request_texture(self.fetcher.as_ref(), self.sender.clone(), url, label)
    }

    // Shaders

    /// Compiles and registers a program
    ///
    /// # Errors
    /// [`SceneError::ShaderBuild`] with the driver log on failure.
    pub fn add_shader_from_sources(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        attribs: &AttribLocations,
        label: &str,
    ) -> Result<ShaderId> {
        let program = self
            .gpu
            .create_program(vertex_source, fragment_source, attribs)
            .map_err(|log| SceneError::ShaderBuild {
                label: label.to_string(),
                log,
            })?;
        self.resources.shaders.insert(label.to_string(), program);
        Ok(program)
    }

    /// Requests a vertex/fragment pair; the shader appears once installed
    pub fn add_shader_from_url_pair(
        &self,
        vertex_url: &str,
        fragment_url: &str,
        label: &str,
        attribs: Option<AttribLocations>,
    ) -> LoadFuture {
        request_shader(
            self.fetcher.as_ref(),
            self.sender.clone(),
            vertex_url,
            fragment_url,
            label,
            attribs,
        )
    }

    /// Shader used when a node names none
    pub fn set_default_shader(&mut self, shader: Option<ShaderId>) {
        self.default_shader = shader;
    }

    /// Last resort program for nodes that resolve no other shader
    pub fn set_fallback_program(&mut self, shader: Option<ShaderId>) {
        self.fallback_program = shader;
    }

    // Meshes, model sources, materials

    pub fn add_model_source(&self, url: &str, label: &str) -> LoadFuture {
        request_model_source(self.fetcher.as_ref(), self.sender.clone(), url, label)
    }

    pub fn add_mesh_from_url(&self, url: &str, label: &str) -> LoadFuture {
        request_mesh(self.fetcher.as_ref(), self.sender.clone(), url, label)
    }

    pub fn add_mesh(&mut self, label: &str, mesh: Mesh) -> Rc<Mesh> {
        let mesh = Rc::new(mesh);
        self.resources.meshes.insert(label.to_string(), mesh.clone());
        mesh
    }

    pub fn add_material(&mut self, label: &str, material: Material) {
        self.resources.materials.insert(label.to_string(), material);
    }

    // Lights

    pub fn set_lights(&mut self, lights: Vec<Light>) {
        self.lights = lights;
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Binds `lights` into slots `1..` of `shader`
    pub fn bind_lights_to_shader(&mut self, lights: &[Light], shader: ShaderId) {
        bind_lights(&mut self.gpu, shader, lights, self.config.max_light_slots);
    }

    /// Rebinds the scene lights to the shader labelled `ads`, if loaded
    pub fn update_lighting(&mut self) {
        match self.resources.shader("ads") {
            Some(shader) => bind_lights(&mut self.gpu, shader, &self.lights, self.config.max_light_slots),
            None => log::debug!("No 'ads' shader loaded, lighting not updated"),
        }
    }

    // Asynchronous loading

    /// Installs every asset delivered since the last call, without blocking
    pub fn install_loaded_assets(&mut self) -> usize {
        let assets = self.inbox.drain();
        let count = assets.len();
        for asset in assets {
            self.install_asset(asset);
        }
        count
    }

    fn install_asset(&mut self, asset: LoadedAsset) {
        match asset {
            LoadedAsset::Texture { label, image } => {
                self.add_texture_from_canvas(&image, Some(&label));
            }
            LoadedAsset::Shader {
                label,
                vertex_source,
                fragment_source,
                attribs,
            } => match self.add_shader_from_sources(&vertex_source, &fragment_source, &attribs, &label) {
                Ok(shader) => {
                    log::debug!("Compiled shader '{}'", label);
                    self.gpu.use_program(shader);
                    Material::shader_default().bind(&mut self.gpu);
                    bind_lights(&mut self.gpu, shader, &self.lights, self.config.max_light_slots);
                }
                Err(e) => log::error!("{}", e),
            },
            LoadedAsset::Mesh { label, mesh } => {
                self.resources.meshes.insert(label, Rc::new(mesh));
            }
            LoadedAsset::ModelSource { label, source } => {
                self.resources.model_sources.insert(label, source);
            }
        }
    }

    /// Installs colours and materials now and starts loading the rest.
    ///
    /// The returned future resolves once every asynchronous asset has been
    /// delivered; they are installed on the next frame.
    pub fn load_prerequisites(&mut self, prerequisites: &Prerequisites) -> Result<LoadFuture> {
        for (label, color) in &prerequisites.colors {
            self.add_texture_from_color(color, label)?;
        }
        for (label, material) in &prerequisites.materials {
            self.add_material(label, material.clone());
        }
        Ok(prerequisites.request_all(self.fetcher.as_ref(), &self.sender))
    }

    // Player

    pub fn set_player_location(&mut self, loc: Vector3<f32>) {
        self.player_location = loc;
    }

    pub fn player_location(&self) -> Vector3<f32> {
        self.player_location
    }

    pub fn spatial_state(&self) -> &PlayerSpatialState {
        &self.spatial
    }

    /// Moves the player's feet, and the raft under them, to `loc`.
    ///
    /// The head's standing-space offset is subtracted so the player's head
    /// ends up above `loc`.
    pub fn move_raft_and_player_to(&mut self, loc: Vector3<f32>, head: &Pose) {
        let position = head.position.unwrap_or_else(Vector3::zero);
        let standing = self.stage.sitting_to_standing * rotation_translation(Quaternion::one(), position);
        let offset = standing.w.truncate();
        let raft_loc = Vector3::new(loc.x - offset.x, loc.y + 0.01, loc.z - offset.z);

        match self.get_object_by_label(RAFT_LABEL).and_then(|id| self.drawable_mut(id)) {
            Some(raft) => raft.relocate_to(raft_loc),
            None => log::warn!("No '{}' object in scene, moving player only", RAFT_LABEL),
        }
        self.set_player_location(raft_loc);
    }

    /// Stock scene: a floor the size of the stage and two gamepad trackers
    pub fn setup_default_scene(&mut self) -> Result<()> {
        log::info!("Using default scene setup");
        self.add_texture_from_color(&ColorSpec::hex("#4169e1"), "royalblue")?;
        self.add_texture_from_color(&ColorSpec::hex("#228b22"), "forestgreen")?;
        self.add_texture_from_color(&ColorSpec::hex("#ffe4b5"), "moccasin")?;

        let floor = Drawable::new(
            GroundedCuboid::new(self.stage.size_x, 0.01, self.stage.size_z),
            Vector3::zero(),
        )
        .with_shader_label("basic")
        .with_texture_label("moccasin")
        .with_label("floor");
        self.add_object(floor);

        for (index, (label, texture)) in [("gpTracker1", "royalblue"), ("gpTracker2", "forestgreen")]
            .into_iter()
            .enumerate()
        {
            let tracker = Drawable::new(ControllerShape, Vector3::new(0.0, -0.5, 0.0))
                .with_label(label)
                .with_texture_label(texture)
                .with_shader_label("basic")
                .with_group_label("gpTrackers")
                .with_behaviour(make_gamepad_tracker(index, |_, _| {}));
            self.add_object(tracker);
        }
        Ok(())
    }
}

fn merge_bounds(a: Option<Bounds>, b: Option<Bounds>) -> Option<Bounds> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Bounds {
            min: [a.min[0].min(b.min[0]), a.min[1].min(b.min[1]), a.min[2].min(b.min[2])],
            max: [a.max[0].max(b.max[0]), a.max[1].max(b.max[1]), a.max[2].max(b.max[2])],
        }),
        (a, b) => a.or(b),
    }
}

/// Children first, then the node itself
fn prepare_recursive<G: GpuContext + ?Sized>(gpu: &mut G, drawable: &mut Drawable) {
    for child in drawable.children.iter_mut() {
        prepare_recursive(gpu, child);
    }
    prepare_drawable(gpu, drawable);
}

/// Divulges the shape, uploads its geometry and resolves face attributes
pub(super) fn prepare_drawable<G: GpuContext + ?Sized>(gpu: &mut G, drawable: &mut Drawable) {
    release_buffers(gpu, drawable);

    let geometry = drawable.shape().divulge();
    match geometry {
        Geometry::Empty => {}
        Geometry::Flat(flat) => {
            drawable.bounds = flat.bounds();
            drawable.buffers = Some(GeometryBuffers::upload(gpu, &flat));
        }
        Geometry::Faced(faces) => {
            for name in drawable.faces.keys() {
                if !faces.contains_key(name) {
                    log::warn!(
                        "Face '{}' is not divulged by {:?}, ignoring its overrides",
                        name,
                        drawable.shape()
                    );
                }
            }
            let mut bounds = None;
            let mut prepared = Vec::with_capacity(faces.len());
            for (name, flat) in &faces {
                bounds = merge_bounds(bounds, flat.bounds());
                let buffers = GeometryBuffers::upload(gpu, flat);
                prepared.push(Face::resolve(name, buffers, drawable.faces.get(name), &drawable.attributes));
            }
            drawable.bounds = bounds;
            drawable.prepared_faces = prepared;
        }
    }

    if let Some(mesh) = drawable.mesh.clone() {
        drawable.mesh_buffers = Some(MeshBuffers::upload(gpu, &mesh));
    }
    drawable.prepared = true;
}

fn release_buffers<G: GpuContext + ?Sized>(gpu: &mut G, drawable: &mut Drawable) {
    if let Some(buffers) = drawable.buffers.take() {
        buffers.delete(gpu);
    }
    if let Some(buffers) = drawable.mesh_buffers.take() {
        buffers.delete(gpu);
    }
    for face in drawable.prepared_faces.drain(..) {
        face.buffers.delete(gpu);
    }
    drawable.prepared = false;
}

fn release_recursive<G: GpuContext + ?Sized>(gpu: &mut G, drawable: &mut Drawable) {
    for child in drawable.children.iter_mut() {
        release_recursive(gpu, child);
    }
    release_buffers(gpu, drawable);
}
