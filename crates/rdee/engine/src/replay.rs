//! Replay verification.
//!
//! Re-explores a root from its seed and compares trace digests. Traces cut
//! short by cancellation depend on timing and budgets, not only on the seed,
//! so they are not expected to replay.

use crate::controller::RecursionController;
use rdee_types::{RdeeResult, RecursionTree, Trace, TraceDigest, TraceId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The regenerated trace is bit-identical.
    Identical,
    Diverged {
        expected: TraceDigest,
        actual: TraceDigest,
    },
    /// The regenerated tree has no trace ending at this lineage.
    Missing,
}

impl ReplayOutcome {
    pub fn is_identical(&self) -> bool {
        matches!(self, Self::Identical)
    }
}

pub struct Replayer {
    controller: Arc<RecursionController>,
}

impl Replayer {
    pub fn new(controller: Arc<RecursionController>) -> Self {
        Self { controller }
    }

    /// Regenerate the full tree of a root seed.
    pub fn replay_tree(&self, root_seed: u64) -> RdeeResult<RecursionTree> {
        self.controller.explore(root_seed)
    }

    /// Check one recorded trace against a fresh exploration.
    pub fn verify(&self, trace: &Trace) -> RdeeResult<ReplayOutcome> {
        let tree = self.replay_tree(trace.root_seed)?;
        Self::compare(&tree, trace)
    }

    /// Check many traces, exploring each root seed once.
    pub fn verify_all(&self, traces: &[Trace]) -> RdeeResult<Vec<(TraceId, ReplayOutcome)>> {
        let mut trees: HashMap<u64, RecursionTree> = HashMap::new();
        let mut outcomes = Vec::with_capacity(traces.len());
        for trace in traces {
            let tree = match trees.entry(trace.root_seed) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(self.replay_tree(trace.root_seed)?),
            };
            let outcome = Self::compare(tree, trace)?;
            if !outcome.is_identical() {
                tracing::warn!(trace_id = %trace.trace_id, outcome = ?outcome, "trace did not replay");
            }
            outcomes.push((trace.trace_id.clone(), outcome));
        }
        Ok(outcomes)
    }

    fn compare(tree: &RecursionTree, trace: &Trace) -> RdeeResult<ReplayOutcome> {
        let Some(replayed) = tree.find(&trace.lineage()) else {
            return Ok(ReplayOutcome::Missing);
        };
        let expected = trace.digest()?;
        let actual = replayed.digest()?;
        if expected == actual {
            Ok(ReplayOutcome::Identical)
        } else {
            Ok(ReplayOutcome::Diverged { expected, actual })
        }
    }
}
