//! Ray and canvas picking

mod common;

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_relative_eq;
use rust_scene::geometry::quantization::{oct_encode, quantize_positions};
use rust_scene::picking::{BroadPhaseQuery, BroadPhaseResult};
use rust_scene::prelude::*;

use common::{down_ray, object, scene, unit_box, unit_triangle};

const EPSILON: f32 = 1e-5;

#[test]
fn test_surface_pick_interpolates_barycentric_attributes() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    let obj = object(&mut scene, "tri", tri, Vec3::zeros());

    let result = scene.pick(down_ray(0.25, 0.25), &PickQuery::surface()).unwrap();
    assert_eq!(result.node, obj);
    assert_eq!(result.node_id, "tri");
    assert_eq!(result.primitive, PrimitiveKind::Triangles);
    assert_eq!(result.triangle, Some(0));
    assert_relative_eq!(result.distance.unwrap(), 5.0, epsilon = EPSILON);

    let surface = result.surface.unwrap();
    assert_eq!(surface.indices, [0, 1, 2]);
    assert_relative_eq!(surface.world_pos, Vec3::new(0.25, 0.25, 0.0), epsilon = EPSILON);
    assert_relative_eq!(surface.barycentric, Vec3::new(0.5, 0.25, 0.25), epsilon = EPSILON);
    assert_relative_eq!(surface.barycentric.sum(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(surface.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
    assert_relative_eq!(surface.uv.unwrap(), Vec2::new(0.25, 0.25), epsilon = EPSILON);
}

#[test]
fn test_pick_without_surface_skips_narrow_phase() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    object(&mut scene, "tri", tri, Vec3::zeros());

    let result = scene.pick(down_ray(0.25, 0.25), &PickQuery::default()).unwrap();
    assert!(result.surface.is_none());
    assert_eq!(result.triangle, Some(0));

    assert!(scene.pick(down_ray(0.75, 0.75), &PickQuery::default()).is_none());
}

#[test]
fn test_surface_picking_enabled_from_config() {
    let mut scene = Scene::new(SceneConfig::default().with_pick_surface(true));
    let tri = scene.create(unit_triangle()).unwrap();
    object(&mut scene, "tri", tri, Vec3::zeros());

    let result = scene.pick(down_ray(0.25, 0.25), &PickQuery::default()).unwrap();
    assert!(result.surface.is_some());
}

#[test]
fn test_pick_in_transformed_object_space() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    let obj = object(&mut scene, "moved", tri, Vec3::new(10.0, 0.0, 0.0));
    scene.set_scale(obj, Vec3::repeat(2.0));

    let surface = scene
        .pick(down_ray(10.5, 0.5), &PickQuery::surface())
        .and_then(|r| r.surface)
        .unwrap();
    assert_relative_eq!(surface.local_pos, Vec3::new(0.25, 0.25, 0.0), epsilon = EPSILON);
    assert_relative_eq!(surface.world_pos, Vec3::new(10.5, 0.5, 0.0), epsilon = EPSILON);
    assert_relative_eq!(surface.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
}

#[test]
fn test_moved_object_is_picked_at_new_position() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    let obj = object(&mut scene, "tri", tri, Vec3::zeros());
    assert!(scene.pick(down_ray(0.25, 0.25), &PickQuery::default()).is_some());

    scene.set_position(obj, Vec3::new(100.0, 0.0, 0.0));
    assert!(scene.pick(down_ray(0.25, 0.25), &PickQuery::default()).is_none());
    assert_eq!(scene.pick(down_ray(100.25, 0.25), &PickQuery::default()).map(|r| r.node), Some(obj));
}

#[test]
fn test_nearest_object_wins_and_lists_filter() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    let far = object(&mut scene, "far", tri, Vec3::zeros());
    let near = object(&mut scene, "near", tri, Vec3::new(0.0, 0.0, 2.0));

    let hit = |scene: &mut Scene, query: PickQuery| scene.pick(down_ray(0.2, 0.2), &query).map(|r| r.node);
    assert_eq!(hit(&mut scene, PickQuery::default()), Some(near));
    assert_eq!(hit(&mut scene, PickQuery::default().with_exclude(vec![near])), Some(far));
    assert_eq!(hit(&mut scene, PickQuery::default().with_include(vec![far])), Some(far));
    assert_eq!(hit(&mut scene, PickQuery::default().with_include(vec![near]).with_exclude(vec![near])), None);
}

#[test]
fn test_hidden_and_unpickable_objects_are_skipped() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    let far = object(&mut scene, "far", tri, Vec3::zeros());
    let near = object(&mut scene, "near", tri, Vec3::new(0.0, 0.0, 2.0));

    scene.set_pickable(near, false);
    assert_eq!(scene.pick(down_ray(0.2, 0.2), &PickQuery::default()).map(|r| r.node), Some(far));

    scene.set_visible(far, false);
    assert!(scene.pick(down_ray(0.2, 0.2), &PickQuery::default()).is_none());

    scene.set_pickable(near, true);
    scene.set_culled(near, true);
    assert!(scene.pick(down_ray(0.2, 0.2), &PickQuery::default()).is_none());
}

#[test]
fn test_canvas_center_hits_object_under_camera() {
    let mut scene = scene();
    let geometry = scene
        .create(GeometryConfig::new(GeometryArrays::from_positions(vec![
            -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0,
        ])))
        .unwrap();
    let obj = object(&mut scene, "center", geometry, Vec3::zeros());
    scene.set_canvas_size(800, 600);

    let result = scene.pick(PickInput::Canvas(Vec2::new(400.0, 300.0)), &PickQuery::surface()).unwrap();
    assert_eq!(result.node, obj);
    let surface = result.surface.unwrap();
    assert_relative_eq!(surface.world_pos, Vec3::zeros(), epsilon = 1e-4);
    assert_relative_eq!(surface.view_pos, Vec3::new(0.0, 0.0, -10.0), epsilon = 1e-3);

    assert!(scene.pick(PickInput::Canvas(Vec2::new(0.0, 0.0)), &PickQuery::default()).is_none());
}

#[test]
fn test_zero_canvas_reports_and_returns_none() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    object(&mut scene, "tri", tri, Vec3::zeros());
    scene.set_canvas_size(0, 600);

    assert!(scene.pick(PickInput::Canvas(Vec2::new(0.0, 0.0)), &PickQuery::default()).is_none());
    assert!(matches!(scene.last_error(), Some(SceneError::ZeroCanvas { width: 0, height: 600 })));
}

#[test]
fn test_zero_direction_ray_is_rejected() {
    let mut scene = scene();
    let input = PickInput::Ray { origin: Vec3::zeros(), direction: Vec3::zeros() };
    assert!(scene.pick(input, &PickQuery::default()).is_none());
    assert!(matches!(scene.last_error(), Some(SceneError::InvalidValue { field: "direction", .. })));
}

#[test]
fn test_quantized_geometry_picks_like_float() {
    let mut scene = scene();
    let (data, decode) = quantize_positions(&[0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0, 0.0]);
    let up = oct_encode(&Vec3::new(0.0, 0.0, 1.0));
    let mut arrays = GeometryArrays::from_positions(Vec::new())
        .with_normals(NormalData::Oct(up.iter().chain(up.iter()).chain(up.iter()).copied().collect()));
    arrays.positions = PositionData::Quantized { data, decode };
    let geometry = scene.create(GeometryConfig::new(arrays)).unwrap();
    object(&mut scene, "quantized", geometry, Vec3::zeros());

    let surface = scene
        .pick(down_ray(1.0, 1.0), &PickQuery::surface())
        .and_then(|r| r.surface)
        .unwrap();
    assert_relative_eq!(surface.world_pos, Vec3::new(1.0, 1.0, 0.0), epsilon = 1e-3);
    assert_relative_eq!(surface.barycentric.sum(), 1.0, epsilon = 1e-5);
    assert_relative_eq!(surface.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-2);
}

#[test]
fn test_non_triangle_geometry_hits_boundary_without_surface() {
    let mut scene = scene();
    let cloud = scene.create(unit_box()).unwrap();
    let obj = object(&mut scene, "cloud", cloud, Vec3::zeros());

    let result = scene.pick(down_ray(0.0, 0.0), &PickQuery::surface()).unwrap();
    assert_eq!(result.node, obj);
    assert_eq!(result.primitive, PrimitiveKind::Points);
    assert_eq!(result.triangle, None);
    assert!(result.surface.is_none());
    assert_relative_eq!(result.distance.unwrap(), 4.0, epsilon = EPSILON);
}

struct FixedBackend {
    target: Rc<Cell<Option<NodeId>>>,
    redraws: Rc<Cell<u32>>,
}

impl RenderBackend for FixedBackend {
    fn image_dirty(&mut self) {
        self.redraws.set(self.redraws.get() + 1);
    }

    fn pick_candidate(&mut self, _query: &BroadPhaseQuery<'_>) -> BroadPhaseResult {
        match self.target.get() {
            Some(node) => BroadPhaseResult::Hit { node, triangle: Some(0) },
            None => BroadPhaseResult::Miss,
        }
    }
}

#[test]
fn test_backend_broad_phase_is_preferred() {
    let target = Rc::new(Cell::new(None));
    let redraws = Rc::new(Cell::new(0));
    let mut scene = Scene::new(SceneConfig::default()).with_backend(Box::new(FixedBackend {
        target: target.clone(),
        redraws: redraws.clone(),
    }));
    let tri = scene.create(unit_triangle()).unwrap();
    let obj = object(&mut scene, "tri", tri, Vec3::zeros());

    // CPU would hit; the backend says miss
    assert!(scene.pick(down_ray(0.25, 0.25), &PickQuery::default()).is_none());

    target.set(Some(obj));
    let result = scene.pick(down_ray(0.25, 0.25), &PickQuery::surface()).unwrap();
    assert_eq!(result.node, obj);
    assert_eq!(result.distance, None);
    assert_relative_eq!(result.surface.unwrap().world_pos, Vec3::new(0.25, 0.25, 0.0), epsilon = EPSILON);

    let before = redraws.get();
    scene.set_position(obj, Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(redraws.get(), before + 1);
}

struct StaleTriangleBackend {
    target: NodeId,
}

impl RenderBackend for StaleTriangleBackend {
    fn image_dirty(&mut self) {}

    fn pick_candidate(&mut self, _query: &BroadPhaseQuery<'_>) -> BroadPhaseResult {
        BroadPhaseResult::Hit { node: self.target, triangle: Some(99) }
    }
}

#[test]
fn test_backend_triangle_out_of_range_keeps_hit_without_surface() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    let obj = object(&mut scene, "tri", tri, Vec3::zeros());
    let mut scene = scene.with_backend(Box::new(StaleTriangleBackend { target: obj }));

    let result = scene.pick(down_ray(0.25, 0.25), &PickQuery::surface()).unwrap();
    assert_eq!(result.node, obj);
    assert_eq!(result.triangle, Some(99));
    assert!(result.surface.is_none());
}

#[test]
fn test_singular_camera_reports_and_returns_none() {
    let mut scene = scene();
    let tri = scene.create(unit_triangle()).unwrap();
    object(&mut scene, "tri", tri, Vec3::zeros());
    scene.set_canvas_size(800, 600);

    // Eye on the look point leaves no view direction
    let eye = Vec3::new(0.0, 0.0, 10.0);
    scene.set_camera(Camera::perspective(eye, 60.0, 0.1, 100.0).look_at(eye, eye, Vec3::y()));

    let errors = scene.stats().errors;
    assert!(scene.pick(PickInput::Canvas(Vec2::new(400.0, 300.0)), &PickQuery::default()).is_none());
    assert!(matches!(scene.last_error(), Some(SceneError::InvalidValue { field: "camera", .. })));
    assert_eq!(scene.stats().errors, errors + 1);
}
