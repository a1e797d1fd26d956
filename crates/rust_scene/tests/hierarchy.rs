//! Tree structure, cascading attributes and node lifecycle

mod common;

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_relative_eq;
use rust_scene::prelude::*;

use common::{scene, unit_triangle};

fn group(scene: &mut Scene, id: &str) -> NodeId {
    scene.create(GroupConfig::new(SpatialConfig::new().with_id(id))).unwrap()
}

fn empty_object(scene: &mut Scene, id: &str) -> NodeId {
    scene.create(ObjectConfig::new(SpatialConfig::new().with_id(id))).unwrap()
}

#[test]
fn test_cascade_then_override_on_child() {
    let mut scene = scene();
    let g = group(&mut scene, "g");
    let a = empty_object(&mut scene, "a");
    let b = empty_object(&mut scene, "b");
    scene.add_child(g, a);
    scene.add_child(g, b);

    scene.set_visible(g, false);
    assert_eq!(scene.flag(a, NodeFlags::VISIBLE), Some(false));
    assert_eq!(scene.flag(b, NodeFlags::VISIBLE), Some(false));

    scene.set_visible(a, true);
    assert_eq!(scene.flag(a, NodeFlags::VISIBLE), Some(true));
    assert_eq!(scene.flag(g, NodeFlags::VISIBLE), Some(false));
    assert_eq!(scene.flag(b, NodeFlags::VISIBLE), Some(false));
}

#[test]
fn test_new_child_takes_parent_attributes() {
    let mut scene = scene();
    let g = group(&mut scene, "g");
    scene.set_highlighted(g, true);
    scene.set_colorize(g, Vec3::new(1.0, 0.0, 0.0));
    scene.set_opacity(g, 0.5);

    let a = empty_object(&mut scene, "a");
    scene.add_child(g, a);
    let state = scene.cascade_state(a).unwrap();
    assert!(state.flags.contains(NodeFlags::HIGHLIGHTED));
    assert_relative_eq!(state.colorize, Vec3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(state.opacity, 0.5);
}

#[test]
fn test_group_config_builds_children_in_order() {
    let mut scene = scene();
    let g = scene
        .create(
            GroupConfig::new(SpatialConfig::new().with_id("g").with_flag(NodeFlags::PICKABLE, false))
                .with_child(ObjectConfig::new(SpatialConfig::new().with_id("first")))
                .with_child(GroupConfig::new(SpatialConfig::new().with_id("inner")))
                .with_child(ObjectConfig::new(SpatialConfig::new().with_id("last"))),
        )
        .unwrap();

    let ids: Vec<&str> = scene.children(g).iter().filter_map(|c| scene.id_of(*c)).collect();
    assert_eq!(ids, vec!["first", "inner", "last"]);
    let first = scene.find("first").unwrap();
    assert_eq!(scene.flag(first, NodeFlags::PICKABLE), Some(false));
    assert_eq!(scene.subtree(g).len(), 4);
}

#[test]
fn test_cycle_is_refused() {
    let mut scene = scene();
    let outer = group(&mut scene, "outer");
    let inner = group(&mut scene, "inner");
    assert!(scene.add_child(outer, inner));

    assert!(!scene.add_child(inner, outer));
    assert!(matches!(scene.last_error(), Some(SceneError::HierarchyCycle { .. })));
    assert_eq!(scene.parent(outer), None);
    assert_eq!(scene.parent(inner), Some(outer));

    assert!(!scene.add_child(outer, outer));
}

#[test]
fn test_only_groups_accept_children() {
    let mut scene = scene();
    let a = empty_object(&mut scene, "a");
    let b = empty_object(&mut scene, "b");
    assert!(!scene.add_child(a, b));
    assert!(matches!(
        scene.last_error(),
        Some(SceneError::TypeMismatch { expected: NodeType::Group, found: NodeType::Object, .. })
    ));
}

#[test]
fn test_reparent_moves_child_and_updates_bounds() {
    let mut scene = scene();
    let geometry = scene.create(unit_triangle()).unwrap();
    let left = group(&mut scene, "left");
    let right = group(&mut scene, "right");
    let a = scene
        .create(ObjectConfig::new(SpatialConfig::new().with_id("a")).with_geometry(AttachSource::Instance(geometry)))
        .unwrap();
    scene.add_child(left, a);
    assert!(!scene.aabb(left).unwrap().is_empty());

    let parents = Rc::new(Cell::new(0u32));
    let counter = parents.clone();
    scene.subscribe(a, EventKind::Parent, move |_: &mut Scene, _: &Event| counter.set(counter.get() + 1));
    // replayed once from the retained Parent event
    assert_eq!(parents.get(), 1);

    assert!(scene.add_child(right, a));
    assert_eq!(parents.get(), 2);
    assert!(scene.children(left).is_empty());
    assert_eq!(scene.children(right), &[a]);
    assert!(scene.aabb(left).unwrap().is_empty());
    assert!(!scene.aabb(right).unwrap().is_empty());
    assert_eq!(scene.retained(a, &EventKind::Parent), Some(&EventPayload::Node(Some(right))));

    assert!(scene.remove_child(right, a));
    assert_eq!(scene.parent(a), None);
    assert!(!scene.remove_child(right, a));
}

#[test]
fn test_destroy_takes_subtree_once() {
    let mut scene = scene();
    let g = group(&mut scene, "g");
    let inner = group(&mut scene, "inner");
    let leaf = empty_object(&mut scene, "leaf");
    scene.add_child(g, inner);
    scene.add_child(inner, leaf);

    let destroyed = Rc::new(Cell::new(0u32));
    let counter = destroyed.clone();
    scene.subscribe(leaf, EventKind::Destroyed, move |_: &mut Scene, _: &Event| counter.set(counter.get() + 1));

    scene.destroy(g);
    scene.destroy(g);
    scene.destroy(leaf);
    assert_eq!(destroyed.get(), 1);
    assert!(!scene.is_alive(leaf));
    assert!(scene.find("inner").is_none());
    assert_eq!(scene.node_count(), 1);
}

#[test]
fn test_destroying_child_shrinks_parent_bounds() {
    let mut scene = scene();
    let geometry = scene.create(unit_triangle()).unwrap();
    let g = group(&mut scene, "g");
    for x in [0.0, 10.0] {
        let object = scene
            .create(
                ObjectConfig::new(SpatialConfig::new().with_position(Vec3::new(x, 0.0, 0.0)))
                    .with_geometry(AttachSource::Instance(geometry)),
            )
            .unwrap();
        scene.add_child(g, object);
    }
    assert_relative_eq!(scene.aabb(g).unwrap().max.x, 11.0);

    let far = scene.children(g)[1];
    scene.destroy(far);
    assert_relative_eq!(scene.aabb(g).unwrap().max.x, 1.0);
}

#[test]
fn test_duplicate_id_gets_generated_replacement() {
    let mut scene = scene();
    let first = empty_object(&mut scene, "dup");
    let second = empty_object(&mut scene, "dup");

    assert_eq!(scene.find("dup"), Some(first));
    assert_eq!(scene.id_of(second), Some("object#1"));
    assert!(matches!(
        scene.last_error(),
        Some(SceneError::DuplicateId { requested, assigned }) if requested == "dup" && assigned == "object#1"
    ));
}

#[test]
fn test_out_of_range_opacity_is_clamped() {
    let mut scene = scene();
    let a = scene.create(ObjectConfig::new(SpatialConfig::new().with_opacity(1.5))).unwrap();
    assert_relative_eq!(scene.cascade_state(a).unwrap().opacity, 1.0);
    assert!(matches!(scene.last_error(), Some(SceneError::InvalidValue { field: "opacity", .. })));

    scene.set_opacity(a, -2.0);
    assert_relative_eq!(scene.cascade_state(a).unwrap().opacity, 0.0);
}

#[test]
fn test_unknown_primitive_falls_back_to_triangles() {
    let mut scene = scene();
    let geometry = scene.create(unit_triangle().with_primitive("quads")).unwrap();
    assert_eq!(scene.geometry(geometry).unwrap().primitive(), PrimitiveKind::Triangles);
    assert!(matches!(scene.last_error(), Some(SceneError::InvalidValue { field: "primitive", .. })));
}

#[test]
fn test_malformed_geometry_is_rejected() {
    let mut scene = scene();
    let bad = GeometryConfig::new(GeometryArrays::from_positions(vec![0.0; 7]));
    assert!(scene.create(bad).is_none());
    assert!(matches!(scene.last_error(), Some(SceneError::Geometry(_))));

    let out_of_range = unit_triangle();
    let out_of_range = GeometryConfig::new(out_of_range.arrays.with_indices(vec![0, 1, 3]));
    assert!(scene.create(out_of_range).is_none());
}

#[test]
fn test_clear_leaves_only_root() {
    let mut scene = scene();
    let g = group(&mut scene, "g");
    let a = empty_object(&mut scene, "a");
    scene.add_child(g, a);
    scene.create(unit_triangle()).unwrap();

    scene.clear();
    assert_eq!(scene.node_count(), 1);
    assert_eq!(scene.pending_tasks(), 0);
    assert!(scene.is_alive(scene.root()));
    assert!(scene.objects().is_empty());
}
