//! Traces: ordered root-to-terminal records, the unit handed to storage.

use crate::error::{RdeeError, RdeeResult};
use crate::node::{CancelReason, ExistenceNode, LineagePath, StageOrdinal, Verdict};
use crate::parameters::ParameterVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a trace: `{root_seed:016x}/{lineage}`.
///
/// Derived from the root seed and the terminal node's lineage only, so a
/// replayed trace carries the same id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(root_seed: u64, lineage: &LineagePath) -> Self {
        Self(format!("{:016x}/{}", root_seed, lineage))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BLAKE3 hash of a trace's canonical JSON encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceDigest(pub [u8; 32]);

impl TraceDigest {
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for TraceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceDigest({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for TraceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Why a branch collapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseCause {
    /// Score below the stage threshold.
    BelowThreshold,
    /// Passed the threshold but lost the stochastic survival draw.
    StochasticCull,
    /// Survived but the branching policy proposed no children.
    NoOffspring,
}

/// Classification of a branch-local failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    MalformedScore,
    FanoutExceeded,
    InvalidChild,
    MissingParameter,
    Evaluator,
}

/// A branch-local error captured in the trace it terminated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFault {
    pub kind: FaultKind,
    pub message: String,
}

impl BranchFault {
    /// Capture a branch-local error. Returns `None` for fatal errors.
    pub fn from_error(error: &RdeeError) -> Option<Self> {
        error.fault_kind().map(|kind| Self {
            kind,
            message: error.to_string(),
        })
    }
}

/// One entry of a trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Index of the parent record within the trace (`None` for the root).
    pub parent_index: Option<usize>,
    pub lineage: LineagePath,
    pub stage: StageOrdinal,
    pub stage_name: String,
    pub depth: u32,
    pub seed: u64,
    pub parameters: ParameterVector,
    pub score: Option<f64>,
    pub survival_probability: f64,
    pub verdict: Verdict,
    pub diagnostics: BTreeMap<String, f64>,
}

impl StageRecord {
    pub fn from_node(node: &ExistenceNode) -> Self {
        Self {
            parent_index: (node.depth as usize).checked_sub(1),
            lineage: node.lineage.clone(),
            stage: node.stage,
            stage_name: node.stage_name.clone(),
            depth: node.depth,
            seed: node.seed,
            parameters: node.parameters.clone(),
            score: node.score,
            survival_probability: node.survival_probability,
            verdict: node.verdict,
            diagnostics: node.diagnostics.clone(),
        }
    }
}

/// A finalized root-to-terminal path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: TraceId,
    /// Seed sufficient to regenerate the whole recursion tree.
    pub root_seed: u64,
    /// Position in the tree's depth-first emission order.
    pub ordinal: u32,
    pub records: Vec<StageRecord>,
    pub terminal: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_cause: Option<CollapseCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<BranchFault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<CancelReason>,
}

impl Trace {
    pub fn root(&self) -> Option<&StageRecord> {
        self.records.first()
    }

    pub fn leaf(&self) -> Option<&StageRecord> {
        self.records.last()
    }

    pub fn root_parameters(&self) -> Option<&ParameterVector> {
        self.root().map(|r| &r.parameters)
    }

    /// Lineage of the terminal node.
    pub fn lineage(&self) -> LineagePath {
        self.leaf().map(|r| r.lineage.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check the structural invariants of a finalized trace.
    pub fn validate(&self) -> RdeeResult<()> {
        let Some(leaf) = self.records.last() else {
            return Err(RdeeError::TraceInvariant(format!(
                "trace {} has no records",
                self.trace_id
            )));
        };

        for (position, record) in self.records.iter().enumerate() {
            if record.depth as usize != position || record.stage as usize != position {
                return Err(RdeeError::TraceInvariant(format!(
                    "trace {}: record {} has depth {} and stage {}",
                    self.trace_id, position, record.depth, record.stage
                )));
            }
            if record.parent_index != position.checked_sub(1) {
                return Err(RdeeError::TraceInvariant(format!(
                    "trace {}: record {} points at parent {:?}",
                    self.trace_id, position, record.parent_index
                )));
            }
            if record.lineage.depth() != record.depth {
                return Err(RdeeError::TraceInvariant(format!(
                    "trace {}: lineage {} disagrees with depth {}",
                    self.trace_id, record.lineage, record.depth
                )));
            }
            if position + 1 < self.records.len() && record.verdict != Verdict::Survived {
                return Err(RdeeError::TraceInvariant(format!(
                    "trace {}: intermediate record {} is {}",
                    self.trace_id, position, record.verdict
                )));
            }
        }

        if !leaf.verdict.is_terminal() || leaf.verdict != self.terminal {
            return Err(RdeeError::TraceInvariant(format!(
                "trace {}: leaf verdict {} does not match terminal {}",
                self.trace_id, leaf.verdict, self.terminal
            )));
        }
        Ok(())
    }

    /// Canonical JSON encoding.
    pub fn to_canonical_json(&self) -> RdeeResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Content digest, equal for bit-identical traces.
    pub fn digest(&self) -> RdeeResult<TraceDigest> {
        Ok(TraceDigest::hash(&self.to_canonical_json()?))
    }
}

/// All traces produced from one root sample, in depth-first order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecursionTree {
    pub root_seed: u64,
    traces: Vec<Trace>,
}

impl RecursionTree {
    /// Assemble a tree, renumbering trace ordinals in the given order.
    pub fn new(root_seed: u64, mut traces: Vec<Trace>) -> Self {
        for (ordinal, trace) in traces.iter_mut().enumerate() {
            trace.ordinal = ordinal as u32;
        }
        Self { root_seed, traces }
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn into_traces(self) -> Vec<Trace> {
        self.traces
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Number of traces ending with `verdict`.
    pub fn count(&self, verdict: Verdict) -> usize {
        self.traces.iter().filter(|t| t.terminal == verdict).count()
    }

    /// The trace ending at `lineage`, if any.
    pub fn find(&self, lineage: &LineagePath) -> Option<&Trace> {
        self.traces.iter().find(|t| &t.lineage() == lineage)
    }

    /// Number of distinct nodes across all traces.
    pub fn node_count(&self) -> usize {
        self.traces
            .iter()
            .flat_map(|t| t.records.iter().map(|r| &r.lineage))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Deepest record depth reached in the tree.
    pub fn max_depth_reached(&self) -> u32 {
        self.traces
            .iter()
            .filter_map(|t| t.leaf().map(|r| r.depth))
            .max()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> RdeeResult<()> {
        for trace in &self.traces {
            if trace.root_seed != self.root_seed {
                return Err(RdeeError::TraceInvariant(format!(
                    "trace {} belongs to root {:016x}, tree root is {:016x}",
                    trace.trace_id, trace.root_seed, self.root_seed
                )));
            }
            trace.validate()?;
        }
        Ok(())
    }
}
