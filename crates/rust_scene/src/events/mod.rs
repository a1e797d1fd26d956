//! Per-node event bus
//!
//! Each node owns an [`EventBus`]. Publishing walks a snapshot of the listener
//! list so callbacks may freely subscribe, unsubscribe or publish again while
//! being dispatched. A publish can optionally retain its payload; any later
//! subscriber to that kind is invoked immediately with the retained value.
//!
//! The bus itself only stores listeners and retained payloads. Dispatch, the
//! nested-depth guard and statistics live on
//! [`Scene`](crate::scene::Scene) because callbacks need `&mut Scene`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::foundation::math::Vec3;
use crate::scene::bounds::AABB;
use crate::scene::{NodeFlags, NodeId};

/// Event type identification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A node was registered (published on the scene root)
    Created,
    /// A node was destroyed (published on the scene root)
    NodeDestroyed,
    /// This node is being destroyed
    Destroyed,
    /// Configuration or structural error
    Error,
    /// Render-affecting state changed
    Dirty,
    /// Boundary was rebuilt
    Boundary,
    /// Local matrix changed
    Matrix,
    /// Visibility flag changed
    Visible,
    /// Culled flag changed
    Culled,
    /// Pickable flag changed
    Pickable,
    /// Clippable flag changed
    Clippable,
    /// Collidable flag changed
    Collidable,
    /// Selected flag changed
    Selected,
    /// Highlighted flag changed
    Highlighted,
    /// Outlined flag changed
    Outlined,
    /// Ghosted flag changed
    Ghosted,
    /// Colorize changed
    Colorize,
    /// Opacity changed
    Opacity,
    /// Geometry attachment changed
    Geometry,
    /// Parent changed
    Parent,
    /// Application-defined event
    Custom(String),
}

impl EventKind {
    /// Event kind that reports a change of a single cascading flag
    pub fn for_flag(flag: NodeFlags) -> Option<Self> {
        let kind = match flag {
            f if f == NodeFlags::VISIBLE => Self::Visible,
            f if f == NodeFlags::CULLED => Self::Culled,
            f if f == NodeFlags::PICKABLE => Self::Pickable,
            f if f == NodeFlags::CLIPPABLE => Self::Clippable,
            f if f == NodeFlags::COLLIDABLE => Self::Collidable,
            f if f == NodeFlags::SELECTED => Self::Selected,
            f if f == NodeFlags::HIGHLIGHTED => Self::Highlighted,
            f if f == NodeFlags::OUTLINED => Self::Outlined,
            f if f == NodeFlags::GHOSTED => Self::Ghosted,
            _ => return None,
        };
        Some(kind)
    }
}

/// Tagged payload carried by an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// No data
    None,
    /// Boolean attribute value
    Bool(bool),
    /// Scalar attribute value
    Number(f32),
    /// RGB color
    Color(Vec3),
    /// Rebuilt boundary
    Aabb(AABB),
    /// Reference to another node
    Node(Option<NodeId>),
    /// Human-readable text (error messages, custom data)
    Text(String),
}

/// A dispatched event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Node the event was published on
    pub source: NodeId,
    /// Event kind
    pub kind: EventKind,
    /// Event data
    pub payload: EventPayload,
}

/// Event callback. Receives the dispatch context mutably.
pub type Callback<C> = Rc<dyn Fn(&mut C, &Event)>;

/// Unique id of a single subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Token returned by `subscribe`, needed to unsubscribe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// Node the listener is registered on
    pub node: NodeId,
    /// Kind the listener is registered for
    pub kind: EventKind,
    /// Listener id
    pub id: SubscriptionId,
}

/// Listener lists and retained payloads of one node
pub struct EventBus<C> {
    listeners: HashMap<EventKind, Vec<(SubscriptionId, Callback<C>)>>,
    retained: HashMap<EventKind, EventPayload>,
}

impl<C> EventBus<C> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            retained: HashMap::new(),
        }
    }

    /// Register a listener
    pub fn add(&mut self, kind: EventKind, id: SubscriptionId, callback: Callback<C>) {
        self.listeners.entry(kind).or_default().push((id, callback));
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove(&mut self, kind: &EventKind, id: SubscriptionId) -> bool {
        let Some(list) = self.listeners.get_mut(kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(kind);
        }
        removed
    }

    /// Whether a listener is still registered
    pub fn contains(&self, kind: &EventKind, id: SubscriptionId) -> bool {
        self.listeners
            .get(kind)
            .is_some_and(|list| list.iter().any(|(sid, _)| *sid == id))
    }

    /// Snapshot of the listeners for `kind`, in subscription order
    pub fn listeners(&self, kind: &EventKind) -> Vec<(SubscriptionId, Callback<C>)> {
        self.listeners.get(kind).cloned().unwrap_or_default()
    }

    /// Number of listeners registered for `kind`
    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.listeners.get(kind).map_or(0, Vec::len)
    }

    /// Store the latest payload for `kind`
    pub fn retain(&mut self, kind: EventKind, payload: EventPayload) {
        self.retained.insert(kind, payload);
    }

    /// Latest retained payload for `kind`, if any
    pub fn retained(&self, kind: &EventKind) -> Option<&EventPayload> {
        self.retained.get(kind)
    }

    /// Drop every listener and retained payload
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.retained.clear();
    }
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&EventKind, usize> =
            self.listeners.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .field("retained", &self.retained)
            .finish()
    }
}
