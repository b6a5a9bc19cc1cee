//! # rdee-engine
//!
//! Recursive existence filtering: sample a candidate, push it through an
//! ordered chain of viability stages, let survivors bifurcate into perturbed
//! children, and record every root-to-terminal path as a replayable trace.
//!
//! ```text
//!  ExplorationRunner ── worker pool, one root seed per task
//!        │
//!        ▼
//!  RecursionController ── depth-first, bounded by max_depth
//!        │
//!        ├── ParameterSampler   (root parameters)
//!        ├── StageRegistry      (score + diagnostics per stage)
//!        ├── SurvivalFilter     (threshold gate, optional survival draw)
//!        ├── BifurcationHandler (children, fan-out cap)
//!        └── TraceLogger        (one Trace per terminal node)
//!                │
//!                ▼
//!          TraceArchive (rdee-storage)
//! ```
//!
//! ## Invariants
//!
//! - no global generator: every node's generator is seeded from its recorded
//!   seed, so a tree is a pure function of root seed, bounds, registry and policy
//! - a trace never exceeds `max_depth` records; the controller re-checks
//!   depth before evaluating and before branching
//! - a node never has more than `max_fanout` children
//! - every terminal node, whatever its verdict, produces exactly one trace
//! - branch-local errors fault one branch; all other errors stop the run

#![deny(unsafe_code)]

pub mod arena;
pub mod bifurcation;
pub mod cancellation;
pub mod config;
pub mod controller;
pub mod monitor;
pub mod replay;
pub mod rng;
pub mod runner;
pub mod sampler;
pub mod stages;
pub mod survival_filter;
pub mod trace_logger;

pub use arena::NodeArena;
pub use bifurcation::{BifurcationHandler, BranchPolicy, ChildCount, Perturbation, StandardPolicy};
pub use cancellation::{CancellationScope, StopHandle};
pub use config::{BudgetConfig, EngineConfig, MonitorConfig, MAX_DEPTH_LIMIT, MAX_FANOUT_LIMIT};
pub use controller::RecursionController;
pub use monitor::{ProgressEvent, ProgressMonitor, RunStatistics};
pub use replay::{ReplayOutcome, Replayer};
pub use rng::RngState;
pub use runner::{BatchSummary, ExplorationRunner, RunId, VerdictCounts};
pub use sampler::ParameterSampler;
pub use stages::{
    reference_bounds, EvaluateStage, StageDefinition, StageEvaluator, StageInput, StageRegistry,
    StageScore,
};
pub use survival_filter::{
    survival_window, threshold_pass, validate_probability, FilterDecision, PassRule,
    StageThreshold, SurvivalCurve, SurvivalFilter,
};
pub use trace_logger::{Termination, TraceLogger};

pub use rdee_types::*;
