//! Property tests: a tree is a pure function of its root seed.

use proptest::prelude::*;
use rdee_engine::{
    EngineConfig, PassRule, StageRegistry, StageThreshold, StandardPolicy, SurvivalCurve,
};
use rdee_tests::{controller, x_bounds, x_stage};
use std::sync::Arc;

fn stochastic_registry(stages: u32) -> Arc<StageRegistry> {
    let mut registry = StageRegistry::new();
    for i in 0..stages {
        let mut stage = x_stage(&format!("stage-{}", i), 0.1);
        stage.threshold = StageThreshold::new(0.1).with_rule(PassRule::Stochastic {
            curve: SurvivalCurve::Logistic {
                midpoint: 0.5,
                steepness: 8.0,
            },
        });
        registry.register(stage);
    }
    Arc::new(registry)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn replay_is_bit_identical(seed in any::<u64>(), max_depth in 1u32..5) {
        let c = controller(
            x_bounds(0.0, 1.0),
            stochastic_registry(max_depth),
            Arc::new(StandardPolicy::default()),
            EngineConfig::default().with_max_depth(max_depth),
        );
        let first = c.explore(seed).unwrap();
        let second = c.explore(seed).unwrap();
        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.traces().iter().zip(second.traces()) {
            prop_assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        }
    }

    #[test]
    fn parallel_siblings_do_not_change_output(seed in any::<u64>(), split in 1u32..4) {
        let sequential = controller(
            x_bounds(0.0, 1.0),
            stochastic_registry(4),
            Arc::new(StandardPolicy::default()),
            EngineConfig::default().with_max_depth(4),
        );
        let parallel = controller(
            x_bounds(0.0, 1.0),
            stochastic_registry(4),
            Arc::new(StandardPolicy::default()),
            EngineConfig::default()
                .with_max_depth(4)
                .with_parallel_sibling_depth(split),
        );
        let a = sequential.explore(seed).unwrap();
        let b = parallel.explore(seed).unwrap();
        prop_assert_eq!(a, b);
    }
}
