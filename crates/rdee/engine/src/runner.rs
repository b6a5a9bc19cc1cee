//! Batch runner: many root samples on a bounded worker pool.
//!
//! Root seeds come from the master seed, one `u64` per root in order, so a
//! batch is reproducible from `(master_seed, roots)`. Each root is explored
//! on a blocking worker; its traces are persisted in depth-first order once
//! the tree is complete. The first fatal error aborts the batch.

use crate::bifurcation::BranchPolicy;
use crate::cancellation::CancellationScope;
use crate::config::EngineConfig;
use crate::controller::RecursionController;
use crate::monitor::{ProgressEvent, ProgressMonitor};
use crate::rng::RngState;
use crate::stages::StageRegistry;
use chrono::{DateTime, Utc};
use rdee_storage::TraceArchive;
use rdee_types::{ParameterBounds, RdeeError, RdeeResult, RecursionTree, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

/// Identifier of one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trace counts per terminal verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCounts {
    pub collapsed: usize,
    pub depth_exhausted: usize,
    pub cancelled: usize,
    pub faulted: usize,
}

impl VerdictCounts {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Collapsed => self.collapsed += 1,
            Verdict::DepthExhausted => self.depth_exhausted += 1,
            Verdict::Cancelled => self.cancelled += 1,
            Verdict::Faulted => self.faulted += 1,
            Verdict::Survived => {}
        }
    }

    pub fn get(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Collapsed => self.collapsed,
            Verdict::DepthExhausted => self.depth_exhausted,
            Verdict::Cancelled => self.cancelled,
            Verdict::Faulted => self.faulted,
            Verdict::Survived => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.collapsed + self.depth_exhausted + self.cancelled + self.faulted
    }

    fn merge(&mut self, tree: &RecursionTree) {
        for trace in tree.traces() {
            self.record(trace.terminal);
        }
    }
}

/// What a finished batch produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: RunId,
    pub master_seed: u64,
    pub roots: usize,
    pub root_seeds: Vec<u64>,
    pub traces: usize,
    pub verdicts: VerdictCounts,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    /// Share of traces that reached the depth limit.
    pub fn survival_ratio(&self) -> f64 {
        if self.traces == 0 {
            0.0
        } else {
            self.verdicts.depth_exhausted as f64 / self.traces as f64
        }
    }
}

pub struct ExplorationRunner {
    controller: Arc<RecursionController>,
    monitor: ProgressMonitor,
}

impl ExplorationRunner {
    /// Build a runner; all configuration is validated here, before any
    /// sampling.
    pub fn new(
        bounds: Arc<ParameterBounds>,
        registry: Arc<StageRegistry>,
        policy: Arc<dyn BranchPolicy>,
        config: EngineConfig,
    ) -> RdeeResult<Self> {
        let monitor = ProgressMonitor::from_config(&config.monitor);
        let controller = RecursionController::new(bounds, registry, policy, config)?;
        Ok(Self {
            controller: Arc::new(controller),
            monitor,
        })
    }

    pub fn controller(&self) -> &Arc<RecursionController> {
        &self.controller
    }

    pub fn monitor(&self) -> &ProgressMonitor {
        &self.monitor
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<ProgressEvent>> {
        self.monitor.subscribe()
    }

    /// A cancellation scope carrying the configured budgets.
    pub fn scope(&self) -> CancellationScope {
        CancellationScope::from_budget(&self.controller.config().budget)
    }

    /// Root seeds derived from a master seed.
    pub fn root_seeds(master_seed: u64, roots: usize) -> Vec<u64> {
        let mut rng = RngState::from_seed(master_seed);
        (0..roots).map(|_| rng.next_seed()).collect()
    }

    /// Explore `roots` root samples and persist every trace.
    pub async fn run_batch(
        &self,
        master_seed: u64,
        roots: usize,
        archive: Arc<dyn TraceArchive>,
        scope: Arc<CancellationScope>,
    ) -> RdeeResult<BatchSummary> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let root_seeds = Self::root_seeds(master_seed, roots);
        let workers = self.controller.config().workers;

        tracing::info!(
            run_id = %run_id,
            master_seed = master_seed,
            roots = roots,
            workers = workers,
            "batch started"
        );
        self.monitor.emit(ProgressEvent::BatchStarted {
            run_id: run_id.to_string(),
            master_seed,
            roots,
        });

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut join_set = JoinSet::new();

        for &root_seed in &root_seeds {
            let semaphore = semaphore.clone();
            let controller = self.controller.clone();
            let monitor = self.monitor.clone();
            let archive = archive.clone();
            let scope = scope.clone();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| RdeeError::Worker(format!("worker pool closed: {}", e)))?;

                let explorer_monitor = monitor.clone();
                let tree = tokio::task::spawn_blocking(move || {
                    controller.explore_with(root_seed, &scope, &explorer_monitor)
                })
                .await
                .map_err(|e| RdeeError::Worker(format!("root {:016x}: {}", root_seed, e)))??;

                for trace in tree.traces() {
                    archive.persist(trace).await?;
                    monitor.emit(ProgressEvent::TracePersisted {
                        trace_id: trace.trace_id.clone(),
                    });
                }
                Ok::<_, RdeeError>(tree)
            });
        }

        let mut traces = 0;
        let mut verdicts = VerdictCounts::default();
        while let Some(joined) = join_set.join_next().await {
            let outcome = joined
                .map_err(|e| RdeeError::Worker(e.to_string()))
                .and_then(|result| result);
            match outcome {
                Ok(tree) => {
                    traces += tree.len();
                    verdicts.merge(&tree);
                }
                Err(e) => {
                    tracing::error!(run_id = %run_id, error = %e, "batch aborted");
                    join_set.abort_all();
                    return Err(e);
                }
            }
        }

        let finished_at = Utc::now();
        tracing::info!(
            run_id = %run_id,
            traces = traces,
            exhausted = verdicts.depth_exhausted,
            collapsed = verdicts.collapsed,
            cancelled = verdicts.cancelled,
            faulted = verdicts.faulted,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "batch finished"
        );
        self.monitor.emit(ProgressEvent::BatchFinished {
            run_id: run_id.to_string(),
            traces,
        });

        Ok(BatchSummary {
            run_id,
            master_seed,
            roots,
            root_seeds,
            traces,
            verdicts,
            started_at,
            finished_at,
        })
    }
}
