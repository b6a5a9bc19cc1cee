//! Property tests: fan-out and depth limits hold for any tree.

use proptest::prelude::*;
use rdee_engine::{ChildCount, EngineConfig, Perturbation, StandardPolicy};
use rdee_tests::{controller, x_bounds, x_registry};
use rdee_types::{FaultKind, Verdict};
use std::collections::BTreeMap;
use std::sync::Arc;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn children_never_exceed_fanout(
        seed in any::<u64>(),
        max_depth in 1u32..5,
        max_fanout in 1u32..4,
        min_children in 0u32..5,
        extra in 0u32..3,
        threshold in 0f64..0.8,
    ) {
        let policy = StandardPolicy::new()
            .with_children(ChildCount::Between { min: min_children, max: min_children + extra })
            .with_perturbation(Perturbation::Resample);
        let c = controller(
            x_bounds(0.0, 1.0),
            x_registry(max_depth as usize, threshold),
            Arc::new(policy),
            EngineConfig::default().with_max_depth(max_depth).with_max_fanout(max_fanout),
        );
        let tree = c.explore(seed).unwrap();
        prop_assert!(tree.validate().is_ok());

        // Count children per parent lineage across the whole tree.
        let mut children: BTreeMap<_, std::collections::BTreeSet<_>> = BTreeMap::new();
        for trace in tree.traces() {
            for record in &trace.records {
                if let Some(parent) = record.lineage.parent() {
                    children.entry(parent).or_default().insert(record.lineage.clone());
                }
            }
            if trace.terminal == Verdict::Faulted {
                let kind = trace.fault.as_ref().map(|f| f.kind);
                prop_assert_eq!(kind, Some(FaultKind::FanoutExceeded));
            }
        }
        for kids in children.values() {
            prop_assert!(kids.len() <= max_fanout as usize);
        }
    }

    #[test]
    fn depth_exhausted_exactly_at_max_depth(
        seed in any::<u64>(),
        max_depth in 1u32..6,
        threshold in 0f64..0.6,
    ) {
        let c = controller(
            x_bounds(0.0, 1.0),
            x_registry(max_depth as usize, threshold),
            Arc::new(StandardPolicy::default()),
            EngineConfig::default().with_max_depth(max_depth),
        );
        let tree = c.explore(seed).unwrap();
        for trace in tree.traces() {
            prop_assert!(trace.records.len() as u32 <= max_depth);
            if trace.terminal == Verdict::DepthExhausted {
                prop_assert_eq!(trace.leaf().unwrap().depth + 1, max_depth);
            }
            for record in &trace.records[..trace.records.len() - 1] {
                prop_assert_eq!(record.verdict, Verdict::Survived);
            }
        }
    }
}
