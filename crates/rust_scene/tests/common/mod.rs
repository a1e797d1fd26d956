//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::rc::Rc;

use rust_scene::foundation::logging;
use rust_scene::foundation::time::ManualClock;
use rust_scene::prelude::*;

/// Scene with default config and test logging
pub fn scene() -> Scene {
    logging::init_for_tests();
    Scene::new(SceneConfig::default())
}

/// Scene driven by a manual clock
pub fn scene_with_clock(config: SceneConfig) -> (Scene, Rc<ManualClock>) {
    logging::init_for_tests();
    let clock = Rc::new(ManualClock::new());
    let scene = Scene::with_clock(config, clock.clone());
    (scene, clock)
}

/// Triangle (0,0,0), (1,0,0), (0,1,0) with +Z normals and uvs equal to xy
pub fn unit_triangle() -> GeometryConfig {
    GeometryConfig::new(
        GeometryArrays::from_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .with_normals(NormalData::Float(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]))
            .with_uvs(UvData::Float(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0])),
    )
}

/// Corners of the cube [-1, 1]^3 as a point cloud
pub fn unit_box() -> GeometryConfig {
    let mut positions = Vec::new();
    for i in 0..8 {
        positions.push(if i & 1 == 0 { -1.0 } else { 1.0 });
        positions.push(if i & 2 == 0 { -1.0 } else { 1.0 });
        positions.push(if i & 4 == 0 { -1.0 } else { 1.0 });
    }
    GeometryConfig::new(GeometryArrays::from_positions(positions)).with_primitive("points")
}

/// Object at `position` sharing `geometry`
pub fn object(scene: &mut Scene, id: &str, geometry: NodeId, position: Vec3) -> NodeId {
    scene
        .create(
            ObjectConfig::new(SpatialConfig::new().with_id(id).with_position(position))
                .with_geometry(AttachSource::Instance(geometry)),
        )
        .expect("object is created")
}

/// Ray straight down -Z from `(x, y, 5)`
pub fn down_ray(x: f32, y: f32) -> PickInput {
    PickInput::Ray {
        origin: Vec3::new(x, y, 5.0),
        direction: Vec3::new(0.0, 0.0, -1.0),
    }
}
