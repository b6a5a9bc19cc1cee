//! End-to-end test: the three reference scenarios.
//!
//! A single parameter `x` in `[0, 1]`, stages that score `x`, and a
//! threshold of 0.5. The root seed alone decides `x`.

use rdee_engine::{EngineConfig, ParameterSampler, RngState, StageRegistry, StandardPolicy};
use rdee_tests::{controller, init_tracing, x_bounds, x_registry, x_stage, FixedChildren};
use rdee_types::{CollapseCause, Verdict};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First root seed from `from` whose sampled `x` satisfies `accept`.
fn seed_where(from: u64, accept: impl Fn(f64) -> bool) -> (u64, f64) {
    (from..from + 1_000)
        .find_map(|seed| {
            let (vector, _) =
                ParameterSampler::sample(&x_bounds(0.0, 1.0), RngState::from_seed(seed)).ok()?;
            let x = vector.get("x")?;
            accept(x).then_some((seed, x))
        })
        .expect("a matching seed within a thousand draws")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_survivor_exhausts_single_stage() {
    init_tracing();
    let (seed, x) = seed_where(0xA, |x| x > 0.5);
    let c = controller(
        x_bounds(0.0, 1.0),
        x_registry(1, 0.5),
        Arc::new(StandardPolicy::default()),
        EngineConfig::default().with_max_depth(1),
    );

    let tree = c.explore(seed).unwrap();
    assert_eq!(tree.len(), 1);

    let trace = &tree.traces()[0];
    assert_eq!(trace.terminal, Verdict::DepthExhausted);
    assert_eq!(trace.records.len(), 1);
    assert_eq!(trace.records[0].score, Some(x));
    assert_eq!(trace.root_parameters().unwrap().get("x"), Some(x));
    assert_eq!(trace.root_seed, seed);
    trace.validate().unwrap();
}

#[test]
fn scenario_b_low_score_collapses() {
    init_tracing();
    let (seed, x) = seed_where(0xB, |x| x < 0.5);
    let c = controller(
        x_bounds(0.0, 1.0),
        x_registry(1, 0.5),
        Arc::new(StandardPolicy::default()),
        EngineConfig::default().with_max_depth(1),
    );

    let tree = c.explore(seed).unwrap();
    assert_eq!(tree.len(), 1);

    let trace = &tree.traces()[0];
    assert_eq!(trace.terminal, Verdict::Collapsed);
    assert_eq!(trace.collapse_cause, Some(CollapseCause::BelowThreshold));
    assert_eq!(trace.records[0].score, Some(x));
    assert_eq!(trace.root_seed, seed);
}

#[test]
fn scenario_c_one_child_survives_one_collapses() {
    init_tracing();
    let registry = StageRegistry::new()
        .with_stage(x_stage("gate", 0.0))
        .with_stage(x_stage("filter", 0.5));
    let c = controller(
        x_bounds(0.0, 1.0),
        Arc::new(registry),
        Arc::new(FixedChildren::xs(&[0.9, 0.1])),
        EngineConfig::default().with_max_depth(2).with_max_fanout(2),
    );

    let tree = c.explore(0xC).unwrap();
    tree.validate().unwrap();
    assert_eq!(tree.len(), 2);

    let [survivor, collapsed] = tree.traces() else {
        panic!("expected exactly two traces");
    };
    assert_eq!(survivor.terminal, Verdict::DepthExhausted);
    assert_eq!(survivor.leaf().unwrap().parameters.get("x"), Some(0.9));
    assert_eq!(collapsed.terminal, Verdict::Collapsed);
    assert_eq!(collapsed.leaf().unwrap().parameters.get("x"), Some(0.1));

    // Both paths share the root record bit for bit.
    assert_eq!(survivor.records[0], collapsed.records[0]);
    assert_eq!(survivor.records[0].verdict, Verdict::Survived);
    assert_eq!(survivor.ordinal, 0);
    assert_eq!(collapsed.ordinal, 1);
}
