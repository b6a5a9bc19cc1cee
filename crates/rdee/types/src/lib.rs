//! # rdee-types
//!
//! Shared data model for the Recursive Existence Filtering Engine.
//!
//! An existence candidate is a sampled [`ParameterVector`] pushed through an
//! ordered chain of viability stages. Each visited stage produces one
//! [`ExistenceNode`]; each root-to-terminal path through the resulting tree is
//! a [`Trace`], and all traces of one root sample form a [`RecursionTree`].
//!
//! ```text
//!   root (stage 0) ──┬── child r.0 (stage 1) ── … ── terminal
//!                    └── child r.1 (stage 1) ── … ── terminal
//! ```
//!
//! ## Invariants
//!
//! - `lower ≤ upper` for every bounded parameter, log-uniform bounds positive
//! - record `i` of a trace sits at depth `i` and evaluates stage `i`
//! - only the last record of a trace carries a terminal [`Verdict`]
//! - a trace is immutable once finalized; its [`TraceDigest`] proves replay

#![deny(unsafe_code)]

pub mod error;
pub mod node;
pub mod parameters;
pub mod trace;

pub use error::{RdeeError, RdeeResult};
pub use node::{CancelReason, ExistenceNode, LineagePath, NodeId, StageOrdinal, Verdict};
pub use parameters::{DistributionKind, ParameterBounds, ParameterSpec, ParameterVector};
pub use trace::{
    BranchFault, CollapseCause, FaultKind, RecursionTree, StageRecord, Trace, TraceDigest,
    TraceId,
};
