//! # Scene Configuration
//!
//! Tunables for a [`Scene`](crate::scene::Scene): identity, scheduler frame
//! budget, event-depth guard, picking defaults and logging level. Every
//! field has a default so partial TOML/RON files load cleanly.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};

/// Cooperative scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time budget for one [`Scene::tick`](crate::scene::Scene::tick) pass, in milliseconds
    pub frame_budget_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { frame_budget_ms: 10 }
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Nested publishes deeper than this are dropped
    pub max_publish_depth: u32,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { max_publish_depth: 300 }
    }
}

/// Picking defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingConfig {
    /// Compute surface detail (barycentrics, normal, uv) by default
    pub pick_surface: bool,
    /// Canvas width in pixels
    pub canvas_width: u32,
    /// Canvas height in pixels
    pub canvas_height: u32,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            pick_surface: false,
            canvas_width: 1280,
            canvas_height: 720,
        }
    }
}

/// Top-level scene configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Id given to the scene root node
    pub scene_id: String,
    /// Scheduler settings
    pub scheduler: SchedulerConfig,
    /// Event bus settings
    pub events: EventConfig,
    /// Picking defaults
    pub picking: PickingConfig,
    /// Default log filter used by binaries (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            scene_id: "scene".to_string(),
            scheduler: SchedulerConfig::default(),
            events: EventConfig::default(),
            picking: PickingConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config for SceneConfig {}

impl SceneConfig {
    /// Builder: set the root id
    pub fn with_scene_id(mut self, id: impl Into<String>) -> Self {
        self.scene_id = id.into();
        self
    }

    /// Builder: set the per-tick scheduler budget
    pub fn with_frame_budget_ms(mut self, budget_ms: u64) -> Self {
        self.scheduler.frame_budget_ms = budget_ms;
        self
    }

    /// Builder: set the maximum nested publish depth
    pub fn with_max_publish_depth(mut self, depth: u32) -> Self {
        self.events.max_publish_depth = depth;
        self
    }

    /// Builder: request surface detail on picks by default
    pub fn with_pick_surface(mut self, enabled: bool) -> Self {
        self.picking.pick_surface = enabled;
        self
    }

    /// Builder: set the canvas size used for canvas picks
    pub fn with_canvas_size(mut self, width: u32, height: u32) -> Self {
        self.picking.canvas_width = width;
        self.picking.canvas_height = height;
        self
    }

    /// Builder: set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Frame budget as a [`Duration`](std::time::Duration)
    pub fn frame_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.scheduler.frame_budget_ms)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scene_id.is_empty() {
            return Err(ConfigError::Invalid("scene_id must not be empty".to_string()));
        }
        if self.events.max_publish_depth == 0 {
            return Err(ConfigError::Invalid("events.max_publish_depth must be at least 1".to_string()));
        }
        const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)));
        }
        Ok(())
    }
}
