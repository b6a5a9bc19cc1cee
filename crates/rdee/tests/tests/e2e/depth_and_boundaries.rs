//! End-to-end test: depth control and threshold boundaries.

use rdee_engine::{ChildCount, EngineConfig, StandardPolicy, MAX_DEPTH_LIMIT};
use rdee_tests::{controller, init_tracing, x_bounds, x_registry};
use rdee_types::{RdeeError, Verdict};
use std::sync::Arc;

#[test]
fn score_exactly_at_threshold_survives() {
    init_tracing();
    let c = controller(
        x_bounds(0.5, 0.5),
        x_registry(1, 0.5),
        Arc::new(StandardPolicy::default()),
        EngineConfig::default().with_max_depth(1),
    );
    let tree = c.explore(1).unwrap();
    assert_eq!(tree.traces()[0].terminal, Verdict::DepthExhausted);
}

#[test]
fn depth_exhausted_only_at_the_last_level() {
    init_tracing();
    for max_depth in 1..=5u32 {
        let c = controller(
            x_bounds(0.9, 0.9),
            x_registry(max_depth as usize, 0.5),
            Arc::new(StandardPolicy::new().with_children(ChildCount::Fixed { count: 1 })),
            EngineConfig::default().with_max_depth(max_depth),
        );
        let tree = c.explore(u64::from(max_depth)).unwrap();
        assert_eq!(tree.len(), 1);

        let trace = &tree.traces()[0];
        assert_eq!(trace.terminal, Verdict::DepthExhausted);
        assert_eq!(trace.records.len() as u32, max_depth);
        assert_eq!(trace.leaf().unwrap().depth + 1, max_depth);
        assert!(trace.records[..trace.records.len() - 1]
            .iter()
            .all(|r| r.verdict == Verdict::Survived));
    }
}

#[test]
fn records_stay_in_stage_order() {
    init_tracing();
    let c = controller(
        x_bounds(0.0, 1.0),
        x_registry(4, 0.2),
        Arc::new(StandardPolicy::default()),
        EngineConfig::default().with_max_depth(4),
    );
    for seed in 0..20 {
        let tree = c.explore(seed).unwrap();
        for trace in tree.traces() {
            for (i, record) in trace.records.iter().enumerate() {
                assert_eq!(record.stage as usize, i);
                assert_eq!(record.stage_name, format!("stage-{}", i));
            }
        }
    }
}

#[test]
fn depth_beyond_hard_limit_rejected_before_sampling() {
    let err = rdee_engine::RecursionController::new(
        x_bounds(0.0, 1.0),
        x_registry(70, 0.5),
        Arc::new(StandardPolicy::default()),
        EngineConfig::default().with_max_depth(MAX_DEPTH_LIMIT + 1),
    )
    .err()
    .unwrap();
    assert!(matches!(err, RdeeError::InvalidConfig(_)));
}

#[test]
fn deepest_allowed_chain_runs() {
    init_tracing();
    let c = controller(
        x_bounds(0.9, 0.9),
        x_registry(MAX_DEPTH_LIMIT as usize, 0.5),
        Arc::new(StandardPolicy::new().with_children(ChildCount::Fixed { count: 1 })),
        EngineConfig::default().with_max_depth(MAX_DEPTH_LIMIT),
    );
    let tree = c.explore(64).unwrap();
    assert_eq!(tree.traces()[0].records.len() as u32, MAX_DEPTH_LIMIT);
}
