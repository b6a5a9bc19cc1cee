//! Property tests: sampled and perturbed values never leave their bounds.

use proptest::prelude::*;
use rdee_engine::{BranchPolicy, ParameterSampler, Perturbation, RngState, StandardPolicy};
use rdee_types::{
    ExistenceNode, LineagePath, ParameterBounds, ParameterSpec, ParameterVector, Verdict,
};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_uniform_spec() -> impl Strategy<Value = (f64, f64)> {
    (-1e6f64..1e6, 0f64..1e6).prop_map(|(lower, width)| (lower, lower + width))
}

fn arb_log_spec() -> impl Strategy<Value = (f64, f64)> {
    (-30i32..30, 0f64..12.0).prop_map(|(exp, decades)| {
        let lower = 10f64.powi(exp);
        (lower, lower * 10f64.powf(decades))
    })
}

fn arb_bounds() -> impl Strategy<Value = ParameterBounds> {
    (
        prop::collection::vec(arb_uniform_spec(), 1..4),
        prop::collection::vec(arb_log_spec(), 0..3),
    )
        .prop_map(|(uniform, log)| {
            let mut specs: Vec<ParameterSpec> = uniform
                .into_iter()
                .enumerate()
                .map(|(i, (lo, hi))| ParameterSpec::uniform(format!("u{}", i), lo, hi))
                .collect();
            specs.extend(
                log.into_iter()
                    .enumerate()
                    .map(|(i, (lo, hi))| ParameterSpec::log_uniform(format!("l{}", i), lo, hi)),
            );
            ParameterBounds::new(specs).unwrap()
        })
}

fn node_with(parameters: ParameterVector) -> ExistenceNode {
    ExistenceNode {
        stage: 0,
        stage_name: "root".into(),
        depth: 0,
        lineage: LineagePath::root(),
        seed: 0,
        parameters,
        score: Some(1.0),
        survival_probability: 1.0,
        verdict: Verdict::Survived,
        diagnostics: BTreeMap::new(),
        parent: None,
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn sampled_values_within_bounds(bounds in arb_bounds(), seed in any::<u64>()) {
        let (vector, _) = ParameterSampler::sample(&bounds, RngState::from_seed(seed)).unwrap();
        prop_assert_eq!(vector.len(), bounds.len());
        prop_assert!(bounds.check_vector(&vector).is_ok());
    }

    #[test]
    fn perturbed_children_within_bounds(
        bounds in arb_bounds(),
        seed in any::<u64>(),
        scale in 0f64..2.0,
    ) {
        let mut rng = RngState::from_seed(seed);
        let parent = ParameterSampler::draw(&bounds, &mut rng).unwrap();
        let policy = StandardPolicy::new().with_perturbation(Perturbation::Local { scale });
        let children = policy.propose(&node_with(parent), &bounds, 2, &mut rng).unwrap();
        for child in &children {
            prop_assert!(bounds.check_vector(child).is_ok());
        }
    }

    #[test]
    fn sampling_is_a_function_of_the_seed(bounds in arb_bounds(), seed in any::<u64>()) {
        let (a, _) = ParameterSampler::sample(&bounds, RngState::from_seed(seed)).unwrap();
        let (b, _) = ParameterSampler::sample(&bounds, RngState::from_seed(seed)).unwrap();
        prop_assert_eq!(a, b);
    }
}
