//! Trace logger.
//!
//! Keeps the open root-to-current path of records. Every terminal node
//! finalizes one trace from that path, whatever the verdict, so collapsed,
//! cancelled and faulted branches keep their intermediate records.

use rdee_types::{
    BranchFault, CancelReason, CollapseCause, ExistenceNode, RdeeError, RdeeResult,
    RecursionTree, StageRecord, Trace, TraceId, Verdict,
};

/// How a branch ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Termination {
    pub verdict: Verdict,
    pub collapse_cause: Option<CollapseCause>,
    pub fault: Option<BranchFault>,
    pub cancel_reason: Option<CancelReason>,
}

impl Termination {
    pub fn depth_exhausted() -> Self {
        Self {
            verdict: Verdict::DepthExhausted,
            collapse_cause: None,
            fault: None,
            cancel_reason: None,
        }
    }

    pub fn collapsed(cause: CollapseCause) -> Self {
        Self {
            verdict: Verdict::Collapsed,
            collapse_cause: Some(cause),
            fault: None,
            cancel_reason: None,
        }
    }

    pub fn faulted(fault: BranchFault) -> Self {
        Self {
            verdict: Verdict::Faulted,
            collapse_cause: None,
            fault: Some(fault),
            cancel_reason: None,
        }
    }

    pub fn cancelled(reason: CancelReason) -> Self {
        Self {
            verdict: Verdict::Cancelled,
            collapse_cause: None,
            fault: None,
            cancel_reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraceLogger {
    root_seed: u64,
    open: Vec<StageRecord>,
    traces: Vec<Trace>,
}

impl TraceLogger {
    pub fn new(root_seed: u64) -> Self {
        Self {
            root_seed,
            open: Vec::new(),
            traces: Vec::new(),
        }
    }

    /// Append a node to the open path, first rewinding the path to the
    /// node's depth.
    pub fn record(&mut self, node: &ExistenceNode) {
        self.open.truncate(node.depth as usize);
        self.open.push(StageRecord::from_node(node));
    }

    /// Close the open path into a trace.
    pub fn finalize(&mut self, termination: Termination) -> RdeeResult<&Trace> {
        let lineage = self
            .open
            .last()
            .map(|r| r.lineage.clone())
            .ok_or_else(|| RdeeError::TraceInvariant("finalize called on an empty path".into()))?;

        let trace = Trace {
            trace_id: TraceId::new(self.root_seed, &lineage),
            root_seed: self.root_seed,
            ordinal: self.traces.len() as u32,
            records: self.open.clone(),
            terminal: termination.verdict,
            collapse_cause: termination.collapse_cause,
            fault: termination.fault,
            cancel_reason: termination.cancel_reason,
        };
        trace.validate()?;
        self.traces.push(trace);
        self.traces
            .last()
            .ok_or_else(|| RdeeError::TraceInvariant("trace vanished after push".into()))
    }

    /// A logger for a subtree explored elsewhere, sharing the open path.
    pub fn fork(&self) -> Self {
        Self {
            root_seed: self.root_seed,
            open: self.open.clone(),
            traces: Vec::new(),
        }
    }

    /// Take over the traces of a forked logger, after this logger's own.
    pub fn absorb(&mut self, fork: TraceLogger) {
        for mut trace in fork.traces {
            trace.ordinal = self.traces.len() as u32;
            self.traces.push(trace);
        }
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn root_seed(&self) -> u64 {
        self.root_seed
    }

    pub fn into_tree(self) -> RecursionTree {
        RecursionTree::new(self.root_seed, self.traces)
    }
}
