//! Broad-phase index of Object boundaries
//!
//! A flat list with linear ray queries, sufficient for the scene sizes this
//! crate targets. Entries go stale when an Object's boundary is marked dirty
//! and are refreshed lazily right before the next query.

use std::collections::HashMap;

use crate::foundation::math::Vec3;

use super::bounds::AABB;
use super::NodeId;

/// Object id to cached world AABB (`None` while stale)
#[derive(Debug, Default)]
pub struct PickIndex {
    entries: HashMap<NodeId, Option<AABB>>,
}

impl PickIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an Object; starts stale
    pub fn insert(&mut self, node: NodeId) {
        self.entries.insert(node, None);
    }

    /// Stop tracking an Object
    pub fn remove(&mut self, node: NodeId) {
        self.entries.remove(&node);
    }

    /// Mark an entry stale
    pub fn invalidate(&mut self, node: NodeId) {
        if let Some(entry) = self.entries.get_mut(&node) {
            *entry = None;
        }
    }

    /// Entries needing a refresh
    pub fn stale_ids(&self) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|(_, aabb)| aabb.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Store a fresh boundary
    pub fn update(&mut self, node: NodeId, bounds: AABB) {
        if let Some(entry) = self.entries.get_mut(&node) {
            *entry = Some(bounds);
        }
    }

    /// Number of tracked Objects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Objects whose fresh boundary the ray enters, nearest entry first.
    ///
    /// Ties are broken by node id so results are deterministic.
    pub fn query_ray(&self, origin: Vec3, direction: Vec3) -> Vec<(f32, NodeId)> {
        let mut hits: Vec<(f32, NodeId)> = self
            .entries
            .iter()
            .filter_map(|(id, aabb)| {
                aabb.as_ref()
                    .and_then(|b| b.intersect_ray(origin, direction))
                    .map(|t| (t, *id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits
    }
}
