//! Cooperative cancellation.
//!
//! Checked once per node, between sampling and evaluation. A cancelled node
//! is still recorded and its partial trace still persisted.

use crate::config::BudgetConfig;
use rdee_types::CancelReason;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop flag. Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every branch to stop at its next checkpoint.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stop flag plus node and time budgets for one run.
#[derive(Debug, Default)]
pub struct CancellationScope {
    stop: StopHandle,
    max_nodes: Option<u64>,
    admitted: AtomicU64,
    deadline: Option<Instant>,
}

impl CancellationScope {
    /// No budgets; only the stop handle can cancel.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Budgets from configuration. The time limit starts counting now.
    pub fn from_budget(budget: &BudgetConfig) -> Self {
        Self {
            max_nodes: budget.max_nodes,
            deadline: budget
                .time_limit_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            ..Self::default()
        }
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_node_budget(mut self, max_nodes: u64) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Nodes admitted to evaluation so far.
    pub fn nodes_admitted(&self) -> u64 {
        let admitted = self.admitted.load(Ordering::SeqCst);
        match self.max_nodes {
            Some(max) => admitted.min(max),
            None => admitted,
        }
    }

    /// Admit one node, or say why not.
    pub fn checkpoint(&self) -> Option<CancelReason> {
        if self.stop.is_triggered() {
            return Some(CancelReason::Stopped);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(CancelReason::Deadline);
            }
        }
        let previous = self.admitted.fetch_add(1, Ordering::SeqCst);
        match self.max_nodes {
            Some(max) if previous >= max => Some(CancelReason::NodeBudget),
            _ => None,
        }
    }
}
