//! Progress monitoring.
//!
//! Events go out on a `tokio::sync::broadcast` channel. Sending never blocks
//! and a send with no receivers is ignored; slow receivers lag rather than
//! slow the engine down.

use crate::config::MonitorConfig;
use rdee_types::{ExistenceNode, LineagePath, StageOrdinal, Trace, TraceId, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    BatchStarted {
        run_id: String,
        master_seed: u64,
        roots: usize,
    },
    NodeEvaluated {
        root_seed: u64,
        lineage: LineagePath,
        stage: StageOrdinal,
        verdict: Verdict,
    },
    TraceFinalized {
        trace_id: TraceId,
        terminal: Verdict,
        depth: u32,
    },
    TracePersisted {
        trace_id: TraceId,
    },
    TreeCompleted {
        root_seed: u64,
        traces: usize,
    },
    BatchFinished {
        run_id: String,
        traces: usize,
    },
}

/// Handle for emitting progress events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    sender: Option<broadcast::Sender<ProgressEvent>>,
    node_events: bool,
}

impl ProgressMonitor {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Some(sender),
            node_events: true,
        }
    }

    /// A monitor that drops every event.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            node_events: false,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        if config.enabled {
            Self {
                node_events: config.node_events,
                ..Self::new(config.channel_capacity)
            }
        } else {
            Self::disabled()
        }
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<ProgressEvent>> {
        self.sender.as_ref().map(|s| s.subscribe())
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    pub fn node_evaluated(&self, root_seed: u64, node: &ExistenceNode) {
        if self.node_events {
            self.emit(ProgressEvent::NodeEvaluated {
                root_seed,
                lineage: node.lineage.clone(),
                stage: node.stage,
                verdict: node.verdict,
            });
        }
    }

    pub fn trace_finalized(&self, trace: &Trace) {
        if self.sender.is_some() {
            self.emit(ProgressEvent::TraceFinalized {
                trace_id: trace.trace_id.clone(),
                terminal: trace.terminal,
                depth: trace.lineage().depth(),
            });
        }
    }
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Aggregated view of a stream of progress events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub nodes_visited: u64,
    pub survived: u64,
    pub collapsed: u64,
    pub depth_exhausted: u64,
    pub cancelled: u64,
    pub faulted: u64,
    pub traces_finalized: u64,
    pub traces_persisted: u64,
    pub trees_completed: u64,
    pub max_depth_reached: u32,
    /// Events lost to a lagging receiver.
    pub events_missed: u64,
}

impl RunStatistics {
    pub fn observe(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::NodeEvaluated { verdict, .. } => {
                self.nodes_visited += 1;
                match verdict {
                    Verdict::Survived => self.survived += 1,
                    Verdict::Collapsed => self.collapsed += 1,
                    Verdict::DepthExhausted => self.depth_exhausted += 1,
                    Verdict::Cancelled => self.cancelled += 1,
                    Verdict::Faulted => self.faulted += 1,
                }
            }
            ProgressEvent::TraceFinalized { depth, .. } => {
                self.traces_finalized += 1;
                self.max_depth_reached = self.max_depth_reached.max(*depth);
            }
            ProgressEvent::TracePersisted { .. } => self.traces_persisted += 1,
            ProgressEvent::TreeCompleted { .. } => self.trees_completed += 1,
            ProgressEvent::BatchStarted { .. } | ProgressEvent::BatchFinished { .. } => {}
        }
    }

    /// Share of evaluated nodes that passed their stage.
    pub fn survival_ratio(&self) -> f64 {
        if self.nodes_visited == 0 {
            return 0.0;
        }
        (self.survived + self.depth_exhausted) as f64 / self.nodes_visited as f64
    }

    /// Drain a receiver until every sender is gone.
    pub async fn collect(mut receiver: broadcast::Receiver<ProgressEvent>) -> Self {
        let mut stats = Self::default();
        loop {
            match receiver.recv().await {
                Ok(event) => stats.observe(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => stats.events_missed += missed,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        stats
    }

    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes={} survived={} collapsed={} exhausted={} cancelled={} faulted={} \
             traces={} persisted={} max_depth={} survival={:.3}",
            self.nodes_visited,
            self.survived,
            self.collapsed,
            self.depth_exhausted,
            self.cancelled,
            self.faulted,
            self.traces_finalized,
            self.traces_persisted,
            self.max_depth_reached,
            self.survival_ratio()
        )
    }
}
