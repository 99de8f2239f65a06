//! # Headless Frame
//!
//! Builds the default scene, loads a shader and an image board from memory
//! and renders a few stereo frames into the recording context.
//!
//! Run with `RUST_LOG=debug` to see the asset and render logs.

use anyhow::Context;
use carnival::prelude::*;
use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3, Zero, One};

const BASIC_VS: &str = "attribute vec3 vertexPosition; void main() {}";
const BASIC_FS: &str = "precision mediump float; void main() {}";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let fetcher = MemoryFetcher::new()
        .with_asset("shaders/basic.vs", BASIC_VS)
        .with_asset("shaders/basic.fs", BASIC_FS);
    let clock = ManualClock::new(10_000.0);
    let mut scene = Scene::new(RecordingContext::new())
        .with_fetcher(fetcher)
        .with_clock(clock.clone());

    scene.set_stage_parameters(StageParameters::new(
        3.0,
        2.5,
        Matrix4::from_translation(Vector3::new(0.0, 1.6, 0.0)),
    ));
    scene.setup_default_scene().context("default scene setup failed")?;
    scene.add_texture_from_color(&ColorSpec::hex("#c0c0c0"), "silver")?;

    let prerequisites = Prerequisites::new()
        .with_shader("basic", "shaders/basic.vs", "shaders/basic.fs")
        .with_color("cyan", ColorSpec::hex("#00ffff"));
    let pending = scene.load_prerequisites(&prerequisites)?;
    pollster::block_on(pending).context("prerequisites failed to load")?;

    let poster = TextureImage::from_rgba(64, 32, vec![180; 64 * 32 * 4]).context("bad poster pixels")?;
    scene.add_object(make_image_board(
        poster,
        "poster",
        Vector3::new(0.0, 1.5, -2.0),
        Vector3::zero(),
        Some(1.0),
    ));

    let devices = SharedDevices::new();
    scene.set_device_source(devices.clone());
    devices.set_devices(vec![TrackedDevice {
        pose: Pose::new(Vector3::new(0.2, -0.3, -0.4), Quaternion::one()),
        ..Default::default()
    }]);

    let eye = |x: i32, pov: &str| Viewport {
        x,
        y: 0,
        width: 960,
        height: 1080,
        projection: cgmath::perspective(cgmath::Deg(90.0), 960.0 / 1080.0, 0.1, 100.0),
        view: Matrix4::identity(),
        pov: pov.to_string(),
    };
    let views = [eye(0, LEFT_EYE), eye(960, RIGHT_EYE)];

    for frame in 0..3 {
        let stats = scene.render_views(&views);
        println!("frame {}: {:?}", frame, stats);
        clock.advance(150.0);
    }

    println!(
        "{} objects, {} GPU calls recorded",
        scene.object_count(),
        scene.gpu().calls.len()
    );
    Ok(())
}
