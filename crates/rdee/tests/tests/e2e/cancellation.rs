//! End-to-end test: cooperative cancellation through the batch runner.

use rdee_engine::{
    BudgetConfig, CancellationScope, EngineConfig, ExplorationRunner, StandardPolicy, StopHandle,
};
use rdee_storage::{InMemoryTraceArchive, TraceArchive};
use rdee_tests::{init_tracing, x_bounds, x_registry};
use rdee_types::{CancelReason, Verdict};
use std::sync::Arc;
use std::time::Instant;

fn runner(config: EngineConfig) -> ExplorationRunner {
    ExplorationRunner::new(
        x_bounds(0.9, 0.9),
        x_registry(config.max_depth as usize, 0.5),
        Arc::new(StandardPolicy::default()),
        config,
    )
    .unwrap()
}

#[tokio::test]
async fn node_budget_caps_evaluated_nodes() {
    init_tracing();
    let config = EngineConfig::default()
        .with_max_depth(3)
        .with_workers(1)
        .with_budget(BudgetConfig {
            max_nodes: Some(5),
            time_limit_ms: None,
        });
    let runner = runner(config);
    let archive = Arc::new(InMemoryTraceArchive::new());
    let scope = Arc::new(runner.scope());

    let summary = runner
        .run_batch(11, 3, archive.clone(), scope.clone())
        .await
        .unwrap();

    assert_eq!(scope.nodes_admitted(), 5);
    assert!(summary.verdicts.cancelled > 0);
    assert_eq!(archive.count().await.unwrap(), summary.traces);

    let scored: usize = archive
        .traces()
        .unwrap()
        .iter()
        .flat_map(|t| t.records.iter())
        .filter(|r| r.score.is_some())
        .map(|r| (r.lineage.clone(), r.seed))
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    assert!(scored <= 5);

    for trace in archive.traces().unwrap() {
        if trace.terminal == Verdict::Cancelled {
            assert_eq!(trace.cancel_reason, Some(CancelReason::NodeBudget));
            assert_eq!(trace.leaf().unwrap().score, None);
            trace.validate().unwrap();
        }
    }
}

#[tokio::test]
async fn elapsed_deadline_cancels_every_root() {
    init_tracing();
    let runner = runner(EngineConfig::default().with_max_depth(2));
    let archive = Arc::new(InMemoryTraceArchive::new());
    let scope = Arc::new(CancellationScope::unbounded().with_deadline(Instant::now()));

    let summary = runner.run_batch(2, 4, archive.clone(), scope).await.unwrap();
    assert_eq!(summary.traces, 4);
    assert_eq!(summary.verdicts.cancelled, 4);
    for trace in archive.traces().unwrap() {
        assert_eq!(trace.cancel_reason, Some(CancelReason::Deadline));
        assert_eq!(trace.records.len(), 1);
    }
}

#[tokio::test]
async fn external_stop_handle_reaches_workers() {
    init_tracing();
    let runner = runner(EngineConfig::default().with_max_depth(2));
    let handle = StopHandle::new();
    let scope = Arc::new(CancellationScope::unbounded().with_stop_handle(handle.clone()));
    handle.trigger();

    let archive = Arc::new(InMemoryTraceArchive::new());
    let summary = runner.run_batch(3, 2, archive, scope).await.unwrap();
    assert_eq!(summary.verdicts.get(Verdict::Cancelled), 2);
    assert_eq!(summary.verdicts.get(Verdict::DepthExhausted), 0);
}
