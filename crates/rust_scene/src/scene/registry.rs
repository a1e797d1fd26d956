//! The scene context: node arena, id registry, event dispatch, error
//! channel and scheduler glue.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use slotmap::SlotMap;

use crate::config::SceneConfig;
use crate::error::SceneError;
use crate::events::{Event, EventKind, EventPayload, Subscription, SubscriptionId};
use crate::foundation::time::{Clock, SystemClock};
use crate::geometry::GeometryBuffer;
use crate::picking::{Camera, NullBackend, RenderBackend, Viewport};
use crate::scheduler::{self, Scheduler, Task, TaskContext};

use super::bounds::AABB;
use super::node::{NodeBody, NodeEntry, NodeId, NodeType};
use super::pick_index::PickIndex;
use super::spatial::SpatialNode;

/// Counters describing scene activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Publishes that reached dispatch
    pub published_events: u64,
    /// Publishes dropped by the nesting guard
    pub dropped_events: u64,
    /// Boundary cache rebuilds
    pub boundary_rebuilds: u64,
    /// Scheduled tasks executed
    pub tasks_run: u64,
    /// Scheduled tasks skipped because their scope was destroyed
    pub tasks_skipped: u64,
    /// Redraw requests forwarded to the backend
    pub redraw_requests: u64,
    /// Errors reported on the error channel
    pub errors: u64,
}

/// Explicit scene context owning every node
///
/// There is no global state: all operations go through a `Scene`, and event
/// callbacks and scheduled tasks receive it mutably.
pub struct Scene {
    pub(crate) config: SceneConfig,
    pub(crate) nodes: SlotMap<NodeId, NodeEntry>,
    pub(crate) ids: HashMap<String, NodeId>,
    pub(crate) root: NodeId,
    pub(crate) id_counters: HashMap<NodeType, u64>,
    next_subscription: u64,
    publish_depth: u32,
    scheduler: Scheduler<Scene>,
    clock: Rc<dyn Clock>,
    pub(crate) backend: Box<dyn RenderBackend>,
    pub(crate) camera: Camera,
    pub(crate) viewport: Viewport,
    pub(crate) pick_index: PickIndex,
    pub(crate) scene_aabb: Option<AABB>,
    pub(crate) stats: SceneStats,
    last_error: Option<SceneError>,
}

impl Scene {
    /// Create a scene using the system clock
    pub fn new(config: SceneConfig) -> Self {
        Self::with_clock(config, Rc::new(SystemClock))
    }

    /// Create a scene with an injected clock for the scheduler budget
    pub fn with_clock(config: SceneConfig, clock: Rc<dyn Clock>) -> Self {
        let (config, invalid) = match config.validate() {
            Ok(()) => (config, None),
            Err(err) => (SceneConfig::default(), Some(err)),
        };
        let viewport = Viewport::new(config.picking.canvas_width, config.picking.canvas_height);
        let root_id = config.scene_id.clone();

        let mut scene = Self {
            config,
            nodes: SlotMap::with_key(),
            ids: HashMap::new(),
            root: NodeId::default(),
            id_counters: HashMap::new(),
            next_subscription: 0,
            publish_depth: 0,
            scheduler: Scheduler::new(),
            clock,
            backend: Box::new(NullBackend),
            camera: Camera::default(),
            viewport,
            pick_index: PickIndex::new(),
            scene_aabb: None,
            stats: SceneStats::default(),
            last_error: None,
        };
        scene.root = scene.register(Some(root_id), NodeType::Component, NodeBody::Component);

        if let Some(err) = invalid {
            scene.report_error(None, SceneError::InvalidValue {
                field: "config",
                message: format!("{err}, using defaults"),
            });
        }
        log::info!("Scene '{}' created", scene.config.scene_id);
        scene
    }

    /// Builder: replace the render backend
    pub fn with_backend(mut self, backend: Box<dyn RenderBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Root node; carries the error channel and lifecycle events
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Activity counters
    pub fn stats(&self) -> SceneStats {
        SceneStats {
            tasks_run: self.scheduler.total_run(),
            tasks_skipped: self.scheduler.total_skipped(),
            ..self.stats
        }
    }

    /// Most recent error reported on the error channel
    pub fn last_error(&self) -> Option<&SceneError> {
        self.last_error.as_ref()
    }

    // ---- registry ----------------------------------------------------

    /// Look a node up by id
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Id of a node
    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|e| e.id.as_str())
    }

    /// Stored entry of a node
    pub fn node(&self, node: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(node)
    }

    /// Type of a node
    pub fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.nodes.get(node).map(|e| e.node_type)
    }

    /// Whether a node exists and is not being torn down
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|e| !e.destroyed)
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All Objects
    pub fn objects(&self) -> Vec<NodeId> {
        self.nodes_of_type(NodeType::Object)
    }

    /// All nodes of one type
    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, e)| e.node_type == node_type && !e.destroyed)
            .map(|(id, _)| id)
            .collect()
    }

    /// Spatial state of a Group or Object
    pub fn spatial(&self, node: NodeId) -> Option<&SpatialNode> {
        self.nodes.get(node)?.spatial()
    }

    pub(crate) fn spatial_mut(&mut self, node: NodeId) -> Option<&mut SpatialNode> {
        self.nodes.get_mut(node)?.spatial_mut()
    }

    /// Buffer of a Geometry node
    pub fn geometry(&self, node: NodeId) -> Option<&GeometryBuffer> {
        self.nodes.get(node)?.geometry()
    }

    pub(crate) fn geometry_mut(&mut self, node: NodeId) -> Option<&mut GeometryBuffer> {
        self.nodes.get_mut(node)?.geometry_mut()
    }

    // ---- lifecycle ---------------------------------------------------

    /// Destroy a node exactly once.
    ///
    /// Spatial nodes take their whole subtree with them; owned attachments
    /// are destroyed, shared ones only released. Listeners get `Destroyed`
    /// before the node leaves the registry; the root gets `NodeDestroyed`.
    /// The scene root lives as long as the scene and is refused.
    pub fn destroy(&mut self, node: NodeId) {
        if node == self.root {
            self.report_error(None, SceneError::InvalidValue {
                field: "node",
                message: "the scene root cannot be destroyed".to_string(),
            });
            return;
        }
        let Some(entry) = self.nodes.get_mut(node) else {
            return;
        };
        if entry.destroyed {
            return;
        }
        entry.destroyed = true;
        let node_type = entry.node_type;
        let id = entry.id.clone();
        let (parent, children) = entry
            .spatial()
            .map(|s| (s.parent, s.children.clone()))
            .unwrap_or_default();
        let slots: Vec<String> = entry.attachments.keys().cloned().collect();
        log::debug!("Destroying {} '{}'", node_type, id);

        for child in children {
            self.destroy(child);
        }
        if let Some(parent) = parent {
            if let Some(spatial) = self.spatial_mut(parent) {
                spatial.children.retain(|c| *c != node);
            }
            self.mark_boundary_dirty(parent);
        }
        for slot in slots {
            self.detach(node, &slot);
        }

        self.dispatch(node, EventKind::Destroyed, EventPayload::None, false);
        let root = self.root;
        self.publish(root, EventKind::NodeDestroyed, EventPayload::Node(Some(node)), false);

        if self.ids.get(&id) == Some(&node) {
            self.ids.remove(&id);
        }
        self.pick_index.remove(node);
        if node_type.is_spatial() {
            self.scene_aabb = None;
        }
        if let Some(mut entry) = self.nodes.remove(node) {
            entry.bus.clear();
        }
    }

    /// Destroy every node except the root and drop all queued tasks
    pub fn clear(&mut self) {
        let nodes: Vec<NodeId> = self.nodes.keys().filter(|n| *n != self.root).collect();
        for node in nodes {
            self.destroy(node);
        }
        self.scheduler.clear();
        self.pick_index.clear();
        self.scene_aabb = None;
        log::info!("Scene '{}' cleared", self.config.scene_id);
    }

    // ---- events ------------------------------------------------------

    /// Publish an event on a node.
    ///
    /// With `retain` the payload is stored and replayed to later subscribers.
    /// Nested publishes beyond the configured depth are dropped.
    pub fn publish(&mut self, node: NodeId, kind: EventKind, payload: EventPayload, retain: bool) {
        if !self.is_alive(node) {
            return;
        }
        self.dispatch(node, kind, payload, retain);
    }

    fn dispatch(&mut self, node: NodeId, kind: EventKind, payload: EventPayload, retain: bool) {
        if self.publish_depth >= self.config.events.max_publish_depth {
            self.stats.dropped_events += 1;
            log::error!(
                "Dropping {:?} on '{}': nested publish depth {} reached",
                kind,
                self.id_of(node).unwrap_or("?"),
                self.publish_depth
            );
            return;
        }
        let Some(entry) = self.nodes.get_mut(node) else {
            return;
        };
        if retain {
            entry.bus.retain(kind.clone(), payload.clone());
        }
        let listeners = entry.bus.listeners(&kind);
        self.stats.published_events += 1;
        if listeners.is_empty() {
            return;
        }

        let event = Event { source: node, kind, payload };
        self.publish_depth += 1;
        for (id, callback) in listeners {
            // Skip listeners removed by an earlier callback of this dispatch
            let registered = self.nodes.get(node).is_some_and(|e| e.bus.contains(&event.kind, id));
            if registered {
                callback(self, &event);
            }
        }
        self.publish_depth -= 1;
    }

    /// Subscribe to `kind` on `node`.
    ///
    /// A retained payload is delivered to the new callback immediately.
    pub fn subscribe(
        &mut self,
        node: NodeId,
        kind: EventKind,
        callback: impl Fn(&mut Scene, &Event) + 'static,
    ) -> Option<Subscription> {
        if !self.is_alive(node) {
            return None;
        }
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        let callback: Rc<dyn Fn(&mut Scene, &Event)> = Rc::new(callback);

        let entry = self.nodes.get_mut(node)?;
        entry.bus.add(kind.clone(), id, callback.clone());
        let retained = entry.bus.retained(&kind).cloned();

        if let Some(payload) = retained {
            let event = Event { source: node, kind: kind.clone(), payload };
            callback(self, &event);
        }
        Some(Subscription { node, kind, id })
    }

    /// Remove a listener. Returns whether it was still registered.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        self.nodes
            .get_mut(subscription.node)
            .is_some_and(|e| e.bus.remove(&subscription.kind, subscription.id))
    }

    /// Number of listeners for `kind` on `node`
    pub fn listener_count(&self, node: NodeId, kind: &EventKind) -> usize {
        self.nodes.get(node).map_or(0, |e| e.bus.listener_count(kind))
    }

    /// Latest retained payload of `kind` on `node`
    pub fn retained(&self, node: NodeId, kind: &EventKind) -> Option<&EventPayload> {
        self.nodes.get(node)?.bus.retained(kind)
    }

    /// Log an error and publish it on the node and on the scene root
    pub fn report_error(&mut self, node: Option<NodeId>, error: SceneError) {
        let origin = node.and_then(|n| self.id_of(n)).unwrap_or(self.config.scene_id.as_str());
        log::error!("[{}] {}", origin, error);
        self.stats.errors += 1;
        let text = error.to_string();
        self.last_error = Some(error);

        let root = self.root;
        if let Some(node) = node.filter(|n| *n != root) {
            self.publish(node, EventKind::Error, EventPayload::Text(text.clone()), false);
        }
        self.publish(root, EventKind::Error, EventPayload::Text(text), false);
    }

    // ---- scheduling --------------------------------------------------

    /// Queue a task. A task with a scope is skipped if that node is gone by then.
    pub fn schedule(&mut self, scope: Option<NodeId>, task: impl FnOnce(&mut Scene) + 'static) {
        self.scheduler.schedule(Task::new(scope, task));
    }

    /// Number of queued tasks
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Run queued tasks until the configured frame budget is spent
    pub fn tick(&mut self) -> usize {
        let deadline = self.clock.now() + self.config.frame_budget();
        self.run_due(deadline)
    }

    /// Run queued tasks until `deadline`
    pub fn run_due(&mut self, deadline: Instant) -> usize {
        scheduler::run_due(self, deadline)
    }

    /// Ask the backend to redraw
    pub fn request_redraw(&mut self) {
        self.stats.redraw_requests += 1;
        self.backend.image_dirty();
    }

    // ---- picking context ---------------------------------------------

    /// Camera used for canvas picks
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the camera
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Canvas size used for canvas picks
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resize the canvas
    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
    }
}

impl TaskContext for Scene {
    fn scheduler_mut(&mut self) -> &mut Scheduler<Self> {
        &mut self.scheduler
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn scope_alive(&self, scope: NodeId) -> bool {
        self.is_alive(scope)
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.config.scene_id)
            .field("nodes", &self.nodes.len())
            .field("scheduler", &self.scheduler)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
