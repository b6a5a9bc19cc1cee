//! Engine configuration.

use rdee_types::{RdeeError, RdeeResult};
use serde::{Deserialize, Serialize};

/// Hard ceiling on `max_depth`, independent of configuration.
pub const MAX_DEPTH_LIMIT: u32 = 64;

/// Hard ceiling on `max_fanout`.
pub const MAX_FANOUT_LIMIT: u32 = 1024;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of stage levels a trace may contain.
    pub max_depth: u32,
    /// Maximum children a single node may bifurcate into.
    pub max_fanout: u32,
    /// Worker slots for root samples in a batch.
    pub workers: usize,
    /// Sibling subtrees whose parent sits above this depth are explored in
    /// parallel. `0` keeps every tree sequential.
    pub parallel_sibling_depth: u32,
    /// Branching factor a node needs before its siblings go parallel.
    /// Narrower bifurcations stay on the current thread.
    pub parallel_min_siblings: u32,
    pub budget: BudgetConfig,
    pub monitor: MonitorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_fanout: 8,
            workers: 4,
            parallel_sibling_depth: 0,
            parallel_min_siblings: 2,
            budget: BudgetConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_fanout(mut self, max_fanout: u32) -> Self {
        self.max_fanout = max_fanout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_parallel_sibling_depth(mut self, depth: u32) -> Self {
        self.parallel_sibling_depth = depth;
        self
    }

    pub fn with_parallel_min_siblings(mut self, siblings: u32) -> Self {
        self.parallel_min_siblings = siblings;
        self
    }

    /// Whether the children of a node at `depth` are explored on rayon.
    pub fn parallel_siblings(&self, depth: u32, siblings: usize) -> bool {
        depth < self.parallel_sibling_depth && siblings >= self.parallel_min_siblings.max(2) as usize
    }

    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    /// Reject configurations the engine refuses to run.
    pub fn validate(&self) -> RdeeResult<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(RdeeError::InvalidConfig(format!(
                "max_depth must be in 1..={}, got {}",
                MAX_DEPTH_LIMIT, self.max_depth
            )));
        }
        if self.max_fanout == 0 || self.max_fanout > MAX_FANOUT_LIMIT {
            return Err(RdeeError::InvalidConfig(format!(
                "max_fanout must be in 1..={}, got {}",
                MAX_FANOUT_LIMIT, self.max_fanout
            )));
        }
        if self.workers == 0 {
            return Err(RdeeError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.budget.max_nodes == Some(0) {
            return Err(RdeeError::InvalidConfig(
                "node budget of 0 would cancel every root".into(),
            ));
        }
        if self.monitor.enabled && self.monitor.channel_capacity == 0 {
            return Err(RdeeError::InvalidConfig(
                "monitor channel capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation budgets. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Nodes admitted to evaluation across a whole batch.
    pub max_nodes: Option<u64>,
    /// Wall-clock limit for a batch, in milliseconds.
    pub time_limit_ms: Option<u64>,
}

/// Progress monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,
    pub channel_capacity: usize,
    /// Emit one event per evaluated node, not just per trace.
    pub node_events: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 1024,
            node_events: true,
        }
    }
}
