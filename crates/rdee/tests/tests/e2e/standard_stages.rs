//! End-to-end test: the built-in physical stage chain on reference bounds.

use rdee_engine::{
    reference_bounds, CancellationScope, EngineConfig, ExplorationRunner, Replayer, StageRegistry,
    StandardPolicy,
};
use rdee_storage::InMemoryTraceArchive;
use rdee_tests::init_tracing;
use rdee_types::Verdict;
use std::sync::Arc;

fn standard_runner(config: EngineConfig) -> ExplorationRunner {
    ExplorationRunner::new(
        Arc::new(reference_bounds().unwrap()),
        Arc::new(StageRegistry::standard()),
        Arc::new(StandardPolicy::default()),
        config,
    )
    .unwrap()
}

#[tokio::test]
async fn standard_chain_produces_valid_traces() {
    init_tracing();
    let runner = standard_runner(EngineConfig::default().with_max_depth(5));
    let archive = Arc::new(InMemoryTraceArchive::new());
    let summary = runner
        .run_batch(1, 200, archive.clone(), Arc::new(CancellationScope::unbounded()))
        .await
        .unwrap();

    assert!(summary.traces >= 200);
    assert_eq!(summary.verdicts.faulted, 0);
    for trace in archive.traces().unwrap() {
        trace.validate().unwrap();
        let names: Vec<&str> = trace.records.iter().map(|r| r.stage_name.as_str()).collect();
        let expected = ["cosmological", "stellar", "planetary", "chemical", "evolutionary"];
        assert_eq!(names, &expected[..names.len()]);
        if trace.terminal == Verdict::Collapsed {
            assert!(trace.collapse_cause.is_some());
        }
    }
}

#[test]
fn standard_chain_replays_with_parallel_siblings() {
    init_tracing();
    let runner = standard_runner(
        EngineConfig::default()
            .with_max_depth(5)
            .with_parallel_sibling_depth(3),
    );
    let replayer = Replayer::new(runner.controller().clone());
    for seed in ExplorationRunner::root_seeds(5, 25) {
        let tree = runner.controller().explore(seed).unwrap();
        for (_, outcome) in replayer.verify_all(tree.traces()).unwrap() {
            assert!(outcome.is_identical());
        }
    }
}

#[test]
fn too_few_bounds_for_the_chain_rejected() {
    let bounds = rdee_types::ParameterBounds::new(vec![rdee_types::ParameterSpec::uniform(
        "hubble_constant",
        60.0,
        75.0,
    )])
    .unwrap();
    let err = ExplorationRunner::new(
        Arc::new(bounds),
        Arc::new(StageRegistry::standard()),
        Arc::new(StandardPolicy::default()),
        EngineConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, rdee_types::RdeeError::MissingParameter { stage: 0, .. }));
}
