//! Recursion controller.
//!
//! Drives one root sample through the stage chain, depth first:
//!
//! ```text
//!   Sampling ─► Evaluating ─► Filtering ─┬─► Bifurcating ─► Sampling (children, depth + 1)
//!      │              │                  ├─► Collapsed       (terminal)
//!      ▼              ▼                  └─► DepthExhausted  (terminal)
//!   Cancelled      Faulted
//! ```
//!
//! A node's generator is seeded from its recorded seed. It serves, in order,
//! the survival draw, the bifurcation proposal and one seed per child, so a
//! whole tree is a pure function of its root seed, bounds, registry and
//! policy. Sibling subtrees may run on rayon; their traces are merged back in
//! child order, so output matches sequential exploration exactly.

use crate::arena::NodeArena;
use crate::bifurcation::{BifurcationHandler, BranchPolicy};
use crate::cancellation::CancellationScope;
use crate::config::EngineConfig;
use crate::monitor::{ProgressEvent, ProgressMonitor};
use crate::rng::RngState;
use crate::sampler::ParameterSampler;
use crate::stages::StageRegistry;
use crate::survival_filter::SurvivalFilter;
use crate::trace_logger::{Termination, TraceLogger};
use rayon::prelude::*;
use rdee_types::{
    BranchFault, CollapseCause, ExistenceNode, LineagePath, ParameterBounds, ParameterVector,
    RdeeError, RdeeResult, RecursionTree, Verdict,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node that has parameters but has not been evaluated yet.
struct PendingNode {
    lineage: LineagePath,
    seed: u64,
    parameters: ParameterVector,
    rng: RngState,
}

/// Per-tree context threaded through the recursion.
struct Visit<'a> {
    root_seed: u64,
    scope: &'a CancellationScope,
    monitor: &'a ProgressMonitor,
}

pub struct RecursionController {
    bounds: Arc<ParameterBounds>,
    registry: Arc<StageRegistry>,
    handler: BifurcationHandler,
    config: EngineConfig,
}

impl RecursionController {
    /// Validate everything up front; nothing is sampled on error.
    pub fn new(
        bounds: Arc<ParameterBounds>,
        registry: Arc<StageRegistry>,
        policy: Arc<dyn BranchPolicy>,
        config: EngineConfig,
    ) -> RdeeResult<Self> {
        config.validate()?;
        for spec in bounds.iter() {
            spec.check()?;
        }
        registry.validate_against(&bounds, config.max_depth)?;
        policy.check()?;

        tracing::info!(
            stages = registry.len(),
            parameters = bounds.len(),
            max_depth = config.max_depth,
            max_fanout = config.max_fanout,
            "recursion controller ready"
        );

        let handler = BifurcationHandler::new(policy, config.max_fanout);
        Ok(Self {
            bounds,
            registry,
            handler,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bounds(&self) -> &Arc<ParameterBounds> {
        &self.bounds
    }

    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    /// Explore one root with no budgets and no monitoring.
    pub fn explore(&self, root_seed: u64) -> RdeeResult<RecursionTree> {
        self.explore_with(
            root_seed,
            &CancellationScope::unbounded(),
            &ProgressMonitor::disabled(),
        )
    }

    /// Explore one root under a cancellation scope, reporting progress.
    ///
    /// Returns every trace of the tree in depth-first order. Branch-local
    /// errors become `Faulted` traces; any other error aborts the tree.
    pub fn explore_with(
        &self,
        root_seed: u64,
        scope: &CancellationScope,
        monitor: &ProgressMonitor,
    ) -> RdeeResult<RecursionTree> {
        let mut rng = RngState::from_seed(root_seed);
        let parameters = ParameterSampler::draw(&self.bounds, &mut rng)?;
        let root = PendingNode {
            lineage: LineagePath::root(),
            seed: root_seed,
            parameters,
            rng,
        };

        let visit = Visit {
            root_seed,
            scope,
            monitor,
        };
        let mut arena = NodeArena::new();
        let mut logger = TraceLogger::new(root_seed);
        self.visit(root, &mut arena, &mut logger, &visit)?;

        let tree = logger.into_tree();
        tracing::debug!(
            root_seed = %format!("{:016x}", root_seed),
            traces = tree.len(),
            exhausted = tree.count(Verdict::DepthExhausted),
            "tree explored"
        );
        monitor.emit(ProgressEvent::TreeCompleted {
            root_seed,
            traces: tree.len(),
        });
        Ok(tree)
    }

    fn visit(
        &self,
        pending: PendingNode,
        arena: &mut NodeArena,
        logger: &mut TraceLogger,
        visit: &Visit<'_>,
    ) -> RdeeResult<()> {
        let depth = pending.lineage.depth();
        if depth >= self.config.max_depth {
            return Err(RdeeError::DepthBudgetExceeded {
                depth,
                max_depth: self.config.max_depth,
            });
        }
        let stage = self.registry.get(depth)?;

        let mut node = ExistenceNode {
            stage: depth,
            stage_name: stage.name.clone(),
            depth,
            lineage: pending.lineage,
            seed: pending.seed,
            parameters: pending.parameters,
            score: None,
            survival_probability: 0.0,
            verdict: Verdict::Cancelled,
            diagnostics: BTreeMap::new(),
            parent: arena.last_id(),
        };

        if let Some(reason) = visit.scope.checkpoint() {
            tracing::debug!(lineage = %node.lineage, reason = %reason, "branch cancelled");
            return self.conclude(node, Termination::cancelled(reason), logger, visit);
        }

        let mut rng = pending.rng;
        let parent = node.parent.and_then(|id| arena.get(id));
        let scored = self
            .registry
            .evaluate(depth, parent, &node.parameters)
            .and_then(|score| {
                SurvivalFilter::decide(depth, score.score, &stage.threshold, &mut rng)
                    .map(|decision| (score, decision))
            });

        let (score, decision) = match scored {
            Ok(scored) => scored,
            Err(e) => return self.fault(node, e, logger, visit),
        };
        node.score = Some(score.score);
        node.diagnostics = score.diagnostics;
        node.survival_probability = decision.pass_probability;

        if !decision.survived() {
            node.verdict = Verdict::Collapsed;
            let cause = decision.cause.unwrap_or(CollapseCause::BelowThreshold);
            return self.conclude(node, Termination::collapsed(cause), logger, visit);
        }

        if depth + 1 == self.config.max_depth {
            node.verdict = Verdict::DepthExhausted;
            return self.conclude(node, Termination::depth_exhausted(), logger, visit);
        }

        node.verdict = Verdict::Survived;
        let children = match self.handler.branch(&node, &self.bounds, &mut rng) {
            Ok(children) => children,
            Err(e) => return self.fault(node, e, logger, visit),
        };
        if children.is_empty() {
            node.verdict = Verdict::Collapsed;
            return self.conclude(
                node,
                Termination::collapsed(CollapseCause::NoOffspring),
                logger,
                visit,
            );
        }

        let child_depth = depth + 1;
        if child_depth >= self.config.max_depth {
            return Err(RdeeError::DepthBudgetExceeded {
                depth: child_depth,
                max_depth: self.config.max_depth,
            });
        }

        let pending: Vec<PendingNode> = children
            .into_iter()
            .enumerate()
            .map(|(index, parameters)| {
                let seed = rng.next_seed();
                PendingNode {
                    lineage: node.lineage.child(index as u32),
                    seed,
                    parameters,
                    rng: RngState::from_seed(seed),
                }
            })
            .collect();

        visit.monitor.node_evaluated(visit.root_seed, &node);
        tracing::trace!(lineage = %node.lineage, children = pending.len(), "bifurcating");
        logger.record(&node);
        arena.push(node);

        let result = if self.config.parallel_siblings(depth, pending.len()) {
            self.visit_parallel(pending, arena, logger, visit)
        } else {
            pending
                .into_iter()
                .try_for_each(|child| self.visit(child, arena, logger, visit))
        };
        arena.pop();
        result
    }

    /// Explore sibling subtrees on rayon and merge their traces in order.
    fn visit_parallel(
        &self,
        pending: Vec<PendingNode>,
        arena: &NodeArena,
        logger: &mut TraceLogger,
        visit: &Visit<'_>,
    ) -> RdeeResult<()> {
        let base: &TraceLogger = logger;
        let forks: Vec<TraceLogger> = pending
            .into_par_iter()
            .map(|child| -> RdeeResult<TraceLogger> {
                let mut branch_arena = arena.clone();
                let mut fork = base.fork();
                self.visit(child, &mut branch_arena, &mut fork, visit)?;
                Ok(fork)
            })
            .collect::<RdeeResult<Vec<_>>>()?;

        for fork in forks {
            logger.absorb(fork);
        }
        Ok(())
    }

    /// Finish a branch on an error: branch-local errors become a `Faulted`
    /// trace, anything else propagates.
    fn fault(
        &self,
        mut node: ExistenceNode,
        error: RdeeError,
        logger: &mut TraceLogger,
        visit: &Visit<'_>,
    ) -> RdeeResult<()> {
        let Some(fault) = BranchFault::from_error(&error) else {
            tracing::error!(lineage = %node.lineage, error = %error, "fatal error during exploration");
            return Err(error);
        };
        tracing::warn!(
            root_seed = %format!("{:016x}", visit.root_seed),
            lineage = %node.lineage,
            kind = ?fault.kind,
            error = %error,
            "branch faulted"
        );
        node.verdict = Verdict::Faulted;
        self.conclude(node, Termination::faulted(fault), logger, visit)
    }

    /// Record a terminal node and finalize its trace.
    fn conclude(
        &self,
        node: ExistenceNode,
        termination: Termination,
        logger: &mut TraceLogger,
        visit: &Visit<'_>,
    ) -> RdeeResult<()> {
        visit.monitor.node_evaluated(visit.root_seed, &node);
        tracing::debug!(
            lineage = %node.lineage,
            stage = node.stage,
            verdict = %node.verdict,
            score = ?node.score,
            "branch terminated"
        );
        logger.record(&node);
        let trace = logger.finalize(termination)?;
        visit.monitor.trace_finalized(trace);
        Ok(())
    }
}
