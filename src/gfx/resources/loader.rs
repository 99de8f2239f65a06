//! # Asynchronous Asset Loading
//!
//! Loading happens outside the render loop. A request fetches bytes through an
//! [`AssetFetcher`], decodes them, and sends the result to the scene as a
//! [`LoadedAsset`] message. The scene drains its [`AssetInbox`] without
//! blocking at the start of every frame and installs whatever has arrived.
//!
//! ```text
//! add_texture_from_image(url, label)
//!        │
//!        ▼
//!   fetch bytes ──► decode ──► AssetSender::deliver ──► mpsc
//!                                                       │
//!   Scene::render / advance_simulation                  ▼
//!        └──► install_loaded_assets ◄── AssetInbox::drain
//! ```
//!
//! Until an asset is installed, label lookups simply miss and the draw is
//! skipped. Requests whose scene has been dropped fail with
//! [`SceneError::ChannelClosed`] and are otherwise inert.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::{Result, SceneError};
use crate::gfx::geometry::parse_stl_source;
use crate::gfx::gpu::AttribLocations;
use crate::gfx::mesh::Mesh;
use crate::gfx::resources::material::Material;
use crate::gfx::resources::texture_resource::{ColorSpec, TextureImage};

/// Future resolving to the bytes behind a URL
pub type FetchFuture = BoxFuture<'static, Result<Vec<u8>>>;

/// Completion of a load request
pub type LoadFuture = BoxFuture<'static, Result<()>>;

/// Source of raw asset bytes
pub trait AssetFetcher {
    fn fetch(&self, url: &str) -> FetchFuture;
}

/// Reads assets from a directory on disk
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self::new(".")
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        let path = self.root.join(url.trim_start_matches('/'));
        let url = url.to_string();
        async move {
            std::fs::read(&path).map_err(|e| SceneError::Fetch {
                url,
                reason: e.to_string(),
            })
        }
        .boxed()
    }
}

/// Serves assets from memory. Handy for embedded assets and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    assets: HashMap<String, Arc<Vec<u8>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(url.to_string(), Arc::new(bytes.into()));
    }

    /// Builder pattern: Add an asset
    pub fn with_asset(mut self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        let result = match self.assets.get(url) {
            Some(bytes) => Ok(bytes.as_ref().clone()),
            None => Err(SceneError::Fetch {
                url: url.to_string(),
                reason: "not found".to_string(),
            }),
        };
        future::ready(result).boxed()
    }
}

/// A decoded asset on its way into the scene's resource tables
#[derive(Debug)]
pub enum LoadedAsset {
    Texture {
        label: String,
        image: TextureImage,
    },
    Shader {
        label: String,
        vertex_source: String,
        fragment_source: String,
        attribs: AttribLocations,
    },
    Mesh {
        label: String,
        mesh: Mesh,
    },
    ModelSource {
        label: String,
        source: String,
    },
}

impl LoadedAsset {
    pub fn label(&self) -> &str {
        match self {
            LoadedAsset::Texture { label, .. }
            | LoadedAsset::Shader { label, .. }
            | LoadedAsset::Mesh { label, .. }
            | LoadedAsset::ModelSource { label, .. } => label,
        }
    }
}

/// Sending half of the asset channel; cheap to clone into requests
#[derive(Debug, Clone)]
pub struct AssetSender {
    tx: mpsc::Sender<LoadedAsset>,
}

impl AssetSender {
    pub fn deliver(&self, asset: LoadedAsset) -> Result<()> {
        self.tx
            .send(asset)
            .map_err(|e| SceneError::ChannelClosed(e.0.label().to_string()))
    }
}

/// Receiving half of the asset channel, owned by the scene
#[derive(Debug)]
pub struct AssetInbox {
    rx: mpsc::Receiver<LoadedAsset>,
}

impl AssetInbox {
    /// Everything delivered so far, without blocking
    pub fn drain(&self) -> Vec<LoadedAsset> {
        self.rx.try_iter().collect()
    }
}

pub fn asset_channel() -> (AssetSender, AssetInbox) {
    let (tx, rx) = mpsc::channel();
    (AssetSender { tx }, AssetInbox { rx })
}

fn into_text(url: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| SceneError::NotText(url.to_string()))
}

/// Fetches and decodes an image, delivering it as a texture
pub fn request_texture(fetcher: &dyn AssetFetcher, sender: AssetSender, url: &str, label: &str) -> LoadFuture {
    let fetch = fetcher.fetch(url);
    let label = label.to_string();
    async move {
        let bytes = fetch.await?;
        let image = TextureImage::from_encoded(&bytes)?;
        sender.deliver(LoadedAsset::Texture { label, image })
    }
    .boxed()
}

/// Fetches a vertex/fragment source pair, delivering it for compilation
pub fn request_shader(
    fetcher: &dyn AssetFetcher,
    sender: AssetSender,
    vertex_url: &str,
    fragment_url: &str,
    label: &str,
    attribs: Option<AttribLocations>,
) -> LoadFuture {
    let attribs = attribs.unwrap_or_else(|| {
        log::warn!("No attribute locations were given for shader '{}', using defaults", label);
        AttribLocations::default()
    });
    let fetch_vs = fetcher.fetch(vertex_url);
    let fetch_fs = fetcher.fetch(fragment_url);
    let (vertex_url, fragment_url) = (vertex_url.to_string(), fragment_url.to_string());
    let label = label.to_string();
    async move {
        let (vs, fs) = future::try_join(fetch_vs, fetch_fs).await?;
        sender.deliver(LoadedAsset::Shader {
            label,
            vertex_source: into_text(&vertex_url, vs)?,
            fragment_source: into_text(&fragment_url, fs)?,
            attribs,
        })
    }
    .boxed()
}

/// Fetches model source text (for example ASCII STL) without parsing it
pub fn request_model_source(fetcher: &dyn AssetFetcher, sender: AssetSender, url: &str, label: &str) -> LoadFuture {
    let fetch = fetcher.fetch(url);
    let (url, label) = (url.to_string(), label.to_string());
    async move {
        let source = into_text(&url, fetch.await?)?;
        sender.deliver(LoadedAsset::ModelSource { label, source })
    }
    .boxed()
}

/// Decodes mesh bytes by file extension (`.obj` or ASCII `.stl`)
pub fn decode_mesh(url: &str, bytes: Vec<u8>) -> Result<Mesh> {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".obj") {
        Mesh::from_obj_bytes(&bytes)
    } else if lower.ends_with(".stl") {
        let geometry = parse_stl_source(&into_text(url, bytes)?, 1.0);
        if geometry.indices.is_empty() {
            return Err(SceneError::StlParse(format!("no facets in '{}'", url)));
        }
        Ok(Mesh::from_flat(&geometry))
    } else {
        Err(SceneError::UnsupportedMesh(url.to_string()))
    }
}

/// Fetches and parses a mesh, delivering it into the mesh table
pub fn request_mesh(fetcher: &dyn AssetFetcher, sender: AssetSender, url: &str, label: &str) -> LoadFuture {
    let fetch = fetcher.fetch(url);
    let (url, label) = (url.to_string(), label.to_string());
    async move {
        let mesh = decode_mesh(&url, fetch.await?)?;
        sender.deliver(LoadedAsset::Mesh { label, mesh })
    }
    .boxed()
}

/// A labelled asset URL
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSource {
    pub label: String,
    pub url: String,
}

impl AssetSource {
    pub fn new(label: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

/// A labelled vertex/fragment shader URL pair
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub label: String,
    pub vertex_url: String,
    pub fragment_url: String,
}

impl ShaderSource {
    pub fn new(label: &str, vertex_url: &str, fragment_url: &str) -> Self {
        Self {
            label: label.to_string(),
            vertex_url: vertex_url.to_string(),
            fragment_url: fragment_url.to_string(),
        }
    }
}

/// Everything a scene needs before it is tenable.
///
/// Colours and materials are installed immediately; shaders, meshes and
/// textures load asynchronously.
#[derive(Debug, Clone, Default)]
pub struct Prerequisites {
    pub shaders: Vec<ShaderSource>,
    pub meshes: Vec<AssetSource>,
    pub colors: Vec<(String, ColorSpec)>,
    pub textures: Vec<AssetSource>,
    pub materials: Vec<(String, Material)>,
}

impl Prerequisites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: Add a shader pair
    pub fn with_shader(mut self, label: &str, vertex_url: &str, fragment_url: &str) -> Self {
        self.shaders.push(ShaderSource::new(label, vertex_url, fragment_url));
        self
    }

    /// Builder pattern: Add a mesh
    pub fn with_mesh(mut self, label: &str, url: &str) -> Self {
        self.meshes.push(AssetSource::new(label, url));
        self
    }

    /// Builder pattern: Add a solid colour texture
    pub fn with_color(mut self, label: &str, color: ColorSpec) -> Self {
        self.colors.push((label.to_string(), color));
        self
    }

    /// Builder pattern: Add an image texture
    pub fn with_texture(mut self, label: &str, url: &str) -> Self {
        self.textures.push(AssetSource::new(label, url));
        self
    }

    /// Builder pattern: Add a material
    pub fn with_material(mut self, label: &str, material: Material) -> Self {
        self.materials.push((label.to_string(), material));
        self
    }

    /// Starts every asynchronous request, resolving once all are delivered
    pub fn request_all(&self, fetcher: &dyn AssetFetcher, sender: &AssetSender) -> LoadFuture {
        let mut requests: Vec<LoadFuture> = Vec::new();
        for shader in &self.shaders {
            requests.push(request_shader(
                fetcher,
                sender.clone(),
                &shader.vertex_url,
                &shader.fragment_url,
                &shader.label,
                Some(AttribLocations::default()),
            ));
        }
        for mesh in &self.meshes {
            requests.push(request_mesh(fetcher, sender.clone(), &mesh.url, &mesh.label));
        }
        for texture in &self.textures {
            requests.push(request_texture(fetcher, sender.clone(), &texture.url, &texture.label));
        }
        future::try_join_all(requests).map(|r| r.map(|_| ())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn test_requests_deliver_over_channel() {
        let fetcher = MemoryFetcher::new()
            .with_asset("shaders/basic.vs", "void main() {}")
            .with_asset("shaders/basic.fs", "void main() {}")
            .with_asset("models/tri.obj", TRIANGLE_OBJ);
        let (sender, inbox) = asset_channel();

        assert!(inbox.drain().is_empty());
        block_on(request_shader(
            &fetcher,
            sender.clone(),
            "shaders/basic.vs",
            "shaders/basic.fs",
            "basic",
            None,
        ))
        .unwrap();
        block_on(request_mesh(&fetcher, sender, "models/tri.obj", "tri")).unwrap();

        let delivered = inbox.drain();
        let labels: Vec<&str> = delivered.iter().map(LoadedAsset::label).collect();
        assert_eq!(labels, vec!["basic", "tri"]);
        match &delivered[1] {
            LoadedAsset::Mesh { mesh, .. } => assert_eq!(mesh.indices.len(), 3),
            other => panic!("unexpected asset {:?}", other),
        }
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_missing_asset_fails_soft() {
        let fetcher = MemoryFetcher::new();
        let (sender, inbox) = asset_channel();
        let result = block_on(request_texture(&fetcher, sender, "missing.png", "missing"));
        assert!(matches!(result, Err(SceneError::Fetch { .. })));
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_closed_channel() {
        let fetcher = MemoryFetcher::new().with_asset("a.txt", "solid");
        let (sender, inbox) = asset_channel();
        drop(inbox);
        let result = block_on(request_model_source(&fetcher, sender, "a.txt", "a"));
        assert!(matches!(result, Err(SceneError::ChannelClosed(label)) if label == "a"));
    }

    #[test]
    fn test_decode_mesh_by_extension() {
        assert!(matches!(
            decode_mesh("model.glb", Vec::new()),
            Err(SceneError::UnsupportedMesh(_))
        ));
        assert!(matches!(
            decode_mesh("empty.stl", b"solid x\nendsolid x".to_vec()),
            Err(SceneError::StlParse(_))
        ));
        assert!(matches!(
            decode_mesh("bad.stl", vec![0xff, 0xfe]),
            Err(SceneError::NotText(_))
        ));
    }

    #[test]
    fn test_prerequisites_request_all() {
        let fetcher = MemoryFetcher::new()
            .with_asset("a.vs", "x")
            .with_asset("a.fs", "y")
            .with_asset("m.obj", TRIANGLE_OBJ);
        let prereqs = Prerequisites::new()
            .with_shader("a", "a.vs", "a.fs")
            .with_mesh("m", "m.obj")
            .with_color("red", ColorSpec::hex("#ff0000"));
        let (sender, inbox) = asset_channel();
        block_on(prereqs.request_all(&fetcher, &sender)).unwrap();
        assert_eq!(inbox.drain().len(), 2);
    }
}
