//! Scene Graph Demo
//!
//! Headless walkthrough of the scene graph:
//! - A fleet of tiles sharing one compressed (quantized + octahedral) geometry
//! - Deferred appearance updates drained against the frame budget
//! - Canvas and ray picks with surface detail
//! - Attribute cascades, geometry edits and attachment loss
//!
//! Usage: `scene_demo [config.toml | config.ron]`

use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_scene::foundation::logging;
use rust_scene::geometry::quantization::{oct_encode, quantize_positions, quantize_uvs};
use rust_scene::prelude::*;

// Fleet layout
const TILE_COUNT: usize = 24;
const SCATTER: f32 = 6.0;
const SEED: u64 = 7;

// Drain at most this many ticks before giving up
const MAX_TICKS: usize = 64;

/// Backend that draws nothing and counts redraw requests
struct CountingBackend {
    redraws: Rc<Cell<u64>>,
}

impl RenderBackend for CountingBackend {
    fn image_dirty(&mut self) {
        self.redraws.set(self.redraws.get() + 1);
    }
}

fn load_config() -> (SceneConfig, Option<ConfigError>) {
    match std::env::args().nth(1) {
        Some(path) => match SceneConfig::load_from_file(&path) {
            Ok(config) => (config, None),
            Err(err) => (SceneConfig::default(), Some(err)),
        },
        None => (SceneConfig::default(), None),
    }
}

/// Unit quad in the XY plane as two indexed triangles
fn tile_positions(half: f32) -> Vec<f32> {
    vec![
        -half, -half, 0.0,
        half, -half, 0.0,
        half, half, 0.0,
        -half, half, 0.0,
    ]
}

fn tile_geometry() -> GeometryConfig {
    let (positions, decode) = quantize_positions(&tile_positions(0.5));
    let (uvs, uv_decode) = quantize_uvs(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
    let up = oct_encode(&Vec3::z());
    let normals = up.iter().copied().cycle().take(8).collect();

    let mut arrays = GeometryArrays::from_positions(Vec::new())
        .with_normals(NormalData::Oct(normals))
        .with_uvs(UvData::Quantized { data: uvs, decode: uv_decode })
        .with_indices(vec![0, 1, 2, 0, 2, 3]);
    arrays.positions = PositionData::Quantized { data: positions, decode };
    GeometryConfig::new(arrays).with_id("tile")
}

fn build_fleet(scene: &mut Scene, rng: &mut StdRng) -> Result<(NodeId, NodeId), Box<dyn Error>> {
    let tile = scene.create(tile_geometry()).ok_or("tile geometry rejected")?;
    let fleet = scene
        .create(GroupConfig::new(SpatialConfig::new().with_id("fleet")))
        .ok_or("fleet group rejected")?;

    for i in 0..TILE_COUNT {
        // First tile sits under the canvas center
        let position = if i == 0 {
            Vec3::zeros()
        } else {
            Vec3::new(
                rng.gen_range(-SCATTER..SCATTER),
                rng.gen_range(-SCATTER..SCATTER),
                rng.gen_range(-2.0..0.0),
            )
        };
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let spatial = SpatialConfig::new()
            .with_id(format!("tile_{i:02}"))
            .with_position(position)
            .with_rotation(Quat::from_axis_angle(&Vec3::z_axis(), angle))
            .with_scale(Vec3::repeat(rng.gen_range(0.5..1.5)));
        let object = scene
            .create(ObjectConfig::new(spatial).with_geometry(AttachSource::Instance(tile)))
            .ok_or("tile object rejected")?;
        scene.add_child(fleet, object);
    }
    Ok((fleet, tile))
}

fn drain(scene: &mut Scene) {
    let mut ticks = 0;
    let mut ran = 0;
    while scene.pending_tasks() > 0 && ticks < MAX_TICKS {
        ran += scene.tick();
        ticks += 1;
    }
    info!("Drained {} task(s) in {} tick(s), {} left", ran, ticks, scene.pending_tasks());
}

fn log_pick(label: &str, result: Option<PickResult>) {
    let Some(hit) = result else {
        info!("{label}: nothing");
        return;
    };
    match &hit.surface {
        Some(surface) => info!(
            "{label}: '{}' triangle {} at ({:.3}, {:.3}, {:.3}) uv {:?} weights ({:.3}, {:.3}, {:.3})",
            hit.node_id,
            surface.triangle,
            surface.world_pos.x,
            surface.world_pos.y,
            surface.world_pos.z,
            surface.uv.map(|uv| (uv.x, uv.y)),
            surface.barycentric.x,
            surface.barycentric.y,
            surface.barycentric.z,
        ),
        None => info!("{label}: '{}' ({}) at t={:?}", hit.node_id, hit.primitive, hit.distance),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let (config, load_error) = load_config();
    logging::init_with_level(&config.log_level);
    if let Some(err) = load_error {
        warn!("Falling back to default configuration: {}", err);
    }

    let redraws = Rc::new(Cell::new(0));
    let mut scene = Scene::new(config).with_backend(Box::new(CountingBackend { redraws: redraws.clone() }));
    scene.set_camera(Camera::perspective(Vec3::new(0.0, 0.0, 15.0), 60.0, 0.1, 100.0));

    let root = scene.root();
    scene.subscribe(root, EventKind::NodeDestroyed, |scene: &mut Scene, event: &Event| {
        if let EventPayload::Node(Some(node)) = event.payload {
            info!("Scene '{}' lost a node ({} left)", scene.config().scene_id, scene.node_count() - 1);
            log::debug!("Destroyed handle {:?}", node);
        }
    });

    let mut rng = StdRng::seed_from_u64(SEED);
    let (fleet, tile) = build_fleet(&mut scene, &mut rng)?;
    drain(&mut scene);

    let bounds = scene.scene_aabb();
    info!("Scene bounds {:?} .. {:?}", bounds.min.as_slice(), bounds.max.as_slice());

    let viewport = scene.viewport();
    let center = Vec2::new(viewport.width as f32 / 2.0, viewport.height as f32 / 2.0);
    log_pick("Canvas center", scene.pick(PickInput::Canvas(center), &PickQuery::surface()));

    for i in 0..5 {
        let origin = Vec3::new(rng.gen_range(-SCATTER..SCATTER), rng.gen_range(-SCATTER..SCATTER), 20.0);
        let input = PickInput::Ray { origin, direction: -Vec3::z() };
        log_pick(&format!("Ray {i}"), scene.pick(input, &PickQuery::surface()));
    }

    // Hide the center tile; the pick falls through to whatever lies below
    let center_tile = scene.find("tile_00").ok_or("center tile missing")?;
    scene.set_visible(center_tile, false);
    log_pick("Center, hidden", scene.pick(PickInput::Canvas(center), &PickQuery::surface()));
    scene.set_visible(center_tile, true);

    let query = PickQuery::surface().with_exclude(vec![center_tile]);
    log_pick("Center, excluded", scene.pick(PickInput::Canvas(center), &query));

    // Grow the shared tile; every instance's boundary goes dirty
    let before = scene.stats().boundary_rebuilds;
    scene.set_geometry_positions(tile, PositionData::Float(tile_positions(0.75)));
    let grown = scene.aabb(fleet).unwrap_or_default();
    info!(
        "Fleet bounds after edit {:?} .. {:?} ({} rebuilds)",
        grown.min.as_slice(),
        grown.max.as_slice(),
        scene.stats().boundary_rebuilds - before
    );

    // Dropping the shared geometry empties every slot
    scene.destroy(tile);
    drain(&mut scene);
    log_pick("Center, no geometry", scene.pick(PickInput::Canvas(center), &PickQuery::surface()));

    let stats = scene.stats();
    info!(
        "Done: {} events ({} dropped), {} tasks run, {} skipped, {} boundary rebuilds, {} errors, {} redraws",
        stats.published_events,
        stats.dropped_events,
        stats.tasks_run,
        stats.tasks_skipped,
        stats.boundary_rebuilds,
        stats.errors,
        redraws.get()
    );
    Ok(())
}
