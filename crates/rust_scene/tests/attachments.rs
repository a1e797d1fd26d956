//! Owned and shared attachments

mod common;

use rust_scene::prelude::*;
use rust_scene::scene::GEOMETRY_SLOT;

use common::{object, scene, unit_triangle};

#[test]
fn test_config_attachment_is_owned_and_replaced() {
    let mut scene = scene();
    let obj = scene
        .create(
            ObjectConfig::new(SpatialConfig::new())
                .with_geometry(AttachSource::Config(Box::new(unit_triangle().with_id("own").into()))),
        )
        .unwrap();
    let owned = scene.object_geometry(obj).unwrap();
    assert_eq!(scene.id_of(owned), Some("own"));
    assert_eq!(scene.is_attachment_owned(obj, GEOMETRY_SLOT), Some(true));

    let shared = scene.create(unit_triangle()).unwrap();
    assert_eq!(scene.set_object_geometry(obj, shared), Some(shared));
    assert!(!scene.is_alive(owned));
    assert_eq!(scene.is_attachment_owned(obj, GEOMETRY_SLOT), Some(false));
}

#[test]
fn test_owned_attachment_dies_with_owner() {
    let mut scene = scene();
    let obj = scene
        .create(
            ObjectConfig::new(SpatialConfig::new())
                .with_geometry(AttachSource::Config(Box::new(unit_triangle().into()))),
        )
        .unwrap();
    let owned = scene.object_geometry(obj).unwrap();
    scene.destroy(obj);
    assert!(!scene.is_alive(owned));
}

#[test]
fn test_shared_attachment_outlives_owner() {
    let mut scene = scene();
    let shared = scene.create(unit_triangle().with_id("shared")).unwrap();
    let a = object(&mut scene, "a", shared, Vec3::zeros());
    let b = object(&mut scene, "b", shared, Vec3::zeros());
    assert_eq!(scene.listener_count(shared, &EventKind::Destroyed), 2);

    scene.destroy(a);
    assert!(scene.is_alive(shared));
    assert_eq!(scene.listener_count(shared, &EventKind::Destroyed), 1);
    assert_eq!(scene.object_geometry(b), Some(shared));
}

#[test]
fn test_destroyed_attachment_clears_every_slot() {
    let mut scene = scene();
    let shared = scene.create(unit_triangle()).unwrap();
    let a = object(&mut scene, "a", shared, Vec3::zeros());
    let b = object(&mut scene, "b", shared, Vec3::new(2.0, 0.0, 0.0));
    scene.aabb(a);
    scene.aabb(b);

    scene.destroy(shared);
    assert_eq!(scene.object_geometry(a), None);
    assert_eq!(scene.object_geometry(b), None);
    assert!(scene.aabb(a).unwrap().is_empty());
    assert!(scene.aabb(b).unwrap().is_empty());
}

#[test]
fn test_reattaching_same_node_is_a_no_op() {
    let mut scene = scene();
    let shared = scene.create(unit_triangle().with_id("shared")).unwrap();
    let obj = object(&mut scene, "obj", shared, Vec3::zeros());
    let listeners = scene.listener_count(shared, &EventKind::Dirty);

    assert_eq!(scene.set_object_geometry(obj, AttachSource::Id("shared".to_string())), Some(shared));
    assert_eq!(scene.listener_count(shared, &EventKind::Dirty), listeners);
    assert_eq!(scene.listener_count(shared, &EventKind::Destroyed), 1);
}

#[test]
fn test_detach_releases_listeners() {
    let mut scene = scene();
    let shared = scene.create(unit_triangle()).unwrap();
    let obj = object(&mut scene, "obj", shared, Vec3::zeros());

    assert_eq!(scene.detach(obj, GEOMETRY_SLOT), Some(shared));
    assert!(scene.is_alive(shared));
    assert_eq!(scene.listener_count(shared, &EventKind::Destroyed), 0);
    assert_eq!(scene.listener_count(shared, &EventKind::Dirty), 0);
    assert_eq!(scene.detach(obj, GEOMETRY_SLOT), None);
}

#[test]
fn test_wrong_type_is_refused() {
    let mut scene = scene();
    let obj = scene.create(ObjectConfig::new(SpatialConfig::new())).unwrap();
    let group = scene.create(GroupConfig::new(SpatialConfig::new())).unwrap();
    let before = scene.node_count();

    assert!(scene.set_object_geometry(obj, group).is_none());
    assert!(matches!(
        scene.last_error(),
        Some(SceneError::TypeMismatch { expected: NodeType::Geometry, found: NodeType::Group, .. })
    ));

    let config: NodeConfig = GroupConfig::new(SpatialConfig::new()).into();
    assert!(scene.set_object_geometry(obj, config).is_none());
    assert_eq!(scene.node_count(), before);
}

#[test]
fn test_component_relays_dirty_from_attachment() {
    let mut scene = scene();
    let holder = scene.create(ComponentConfig::new("holder")).unwrap();
    let geometry = scene.create(unit_triangle()).unwrap();
    scene.attach(holder, "mesh", AttachSource::Instance(geometry), NodeType::Geometry, true);

    let relayed = std::rc::Rc::new(std::cell::Cell::new(0u32));
    let counter = relayed.clone();
    scene.subscribe(holder, EventKind::Dirty, move |_: &mut Scene, _: &Event| counter.set(counter.get() + 1));

    scene.set_geometry_uvs(geometry, None);
    assert_eq!(relayed.get(), 1);
}
