//! Existence nodes: the unit of recursion.

use crate::parameters::ParameterVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a stage in the evaluator registry (0-based).
pub type StageOrdinal = u32;

/// Index of a node inside a branch's node arena.
///
/// Parent links are `NodeId`s, never owning references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Child indices from the root down to a node.
///
/// The lineage identifies a node within its recursion tree independently of
/// how the tree was scheduled. Ordering is lexicographic, which is exactly
/// depth-first pre-order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineagePath(Vec<u32>);

impl LineagePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_indices(indices: impl IntoIterator<Item = u32>) -> Self {
        Self(indices.into_iter().collect())
    }

    /// Lineage of the `index`-th child of this node.
    pub fn child(&self, index: u32) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn depth(&self) -> u32 {
        self.0.len() as u32
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &LineagePath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for LineagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r")?;
        for index in &self.0 {
            write!(f, ".{}", index)?;
        }
        Ok(())
    }
}

/// Why a branch was cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// An external caller triggered the stop handle.
    Stopped,
    /// The node-count budget ran out.
    NodeBudget,
    /// The wall-clock deadline passed.
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::NodeBudget => write!(f, "node-budget"),
            Self::Deadline => write!(f, "deadline"),
        }
    }
}

/// Outcome of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Passed its stage and bifurcated. The only non-terminal verdict.
    Survived,
    /// Failed its stage.
    Collapsed,
    /// Survived every stage up to the configured maximum depth.
    DepthExhausted,
    /// Stopped cooperatively before evaluation.
    Cancelled,
    /// Terminated by a branch-local error.
    Faulted,
}

impl Verdict {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Survived)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Survived => "survived",
            Self::Collapsed => "collapsed",
            Self::DepthExhausted => "depth_exhausted",
            Self::Cancelled => "cancelled",
            Self::Faulted => "faulted",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One visited stage of one existence candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExistenceNode {
    /// Stage evaluated at this node.
    pub stage: StageOrdinal,
    pub stage_name: String,
    /// Distance from the root; always equal to `stage`.
    pub depth: u32,
    pub lineage: LineagePath,
    /// Seed of the node's private generator.
    pub seed: u64,
    pub parameters: ParameterVector,
    /// Evaluator score. `None` when the node was cancelled or faulted before scoring.
    pub score: Option<f64>,
    pub survival_probability: f64,
    pub verdict: Verdict,
    pub diagnostics: BTreeMap<String, f64>,
    /// Non-owning back-reference into the branch arena.
    #[serde(skip)]
    pub parent: Option<NodeId>,
}

impl ExistenceNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.verdict.is_terminal()
    }
}
