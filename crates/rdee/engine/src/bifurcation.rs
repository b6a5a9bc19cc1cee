//! Bifurcation: proposing children for a surviving node.

use crate::rng::RngState;
use crate::sampler::ParameterSampler;
use rdee_types::{
    DistributionKind, ExistenceNode, ParameterBounds, ParameterSpec, ParameterVector, RdeeError,
    RdeeResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Proposes child parameter vectors for a surviving node.
///
/// Policies draw only from the `rng` they are handed, which is the parent
/// node's generator; anything else breaks replay.
///
/// A policy should fail with `FanoutExceeded` as soon as it knows it would
/// propose more than `max_fanout` children, before building any of them.
pub trait BranchPolicy: Send + Sync {
    fn propose(
        &self,
        parent: &ExistenceNode,
        bounds: &ParameterBounds,
        max_fanout: u32,
        rng: &mut RngState,
    ) -> RdeeResult<Vec<ParameterVector>>;

    /// Reject unusable policy settings before any sampling.
    fn check(&self) -> RdeeResult<()> {
        Ok(())
    }
}

/// How many children a survivor proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChildCount {
    Fixed { count: u32 },
    /// Uniform in `[min, max]`.
    Between { min: u32, max: u32 },
}

/// How child values relate to the parent's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Perturbation {
    /// Fresh independent draw within the bounds.
    Resample,
    /// Parent value plus a uniform offset of at most `scale × range`,
    /// taken in log space for log-uniform parameters and clamped to bounds.
    Local { scale: f64 },
}

/// Default branching policy: fixed or ranged child count plus a perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardPolicy {
    pub children: ChildCount,
    pub perturbation: Perturbation,
}

impl Default for StandardPolicy {
    fn default() -> Self {
        Self {
            children: ChildCount::Fixed { count: 2 },
            perturbation: Perturbation::Local { scale: 0.05 },
        }
    }
}

impl StandardPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(mut self, children: ChildCount) -> Self {
        self.children = children;
        self
    }

    pub fn with_perturbation(mut self, perturbation: Perturbation) -> Self {
        self.perturbation = perturbation;
        self
    }

    fn child_count(&self, rng: &mut RngState) -> u32 {
        match self.children {
            ChildCount::Fixed { count } => count,
            ChildCount::Between { min, max } => rng.between(min, max),
        }
    }

    fn perturb(spec: &ParameterSpec, parent: f64, scale: f64, rng: &mut RngState) -> f64 {
        match spec.distribution {
            DistributionKind::Uniform => {
                let magnitude = spec.width() * scale;
                (parent + rng.uniform(-magnitude, magnitude))
                    .max(spec.lower)
                    .min(spec.upper)
            }
            DistributionKind::LogUniform => {
                let magnitude = (spec.upper.ln() - spec.lower.ln()) * scale;
                let base = parent.max(spec.lower).ln();
                (base + rng.uniform(-magnitude, magnitude))
                    .exp()
                    .max(spec.lower)
                    .min(spec.upper)
            }
        }
    }
}

impl BranchPolicy for StandardPolicy {
    fn propose(
        &self,
        parent: &ExistenceNode,
        bounds: &ParameterBounds,
        max_fanout: u32,
        rng: &mut RngState,
    ) -> RdeeResult<Vec<ParameterVector>> {
        let count = self.child_count(rng);
        if count > max_fanout {
            return Err(RdeeError::FanoutExceeded {
                requested: count as usize,
                max: max_fanout,
            });
        }
        let mut children = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut values = Vec::with_capacity(bounds.len());
            for spec in bounds.iter() {
                let value = match (self.perturbation, parent.parameters.get(&spec.name)) {
                    (Perturbation::Local { scale }, Some(current)) => {
                        Self::perturb(spec, current, scale, rng)
                    }
                    _ => ParameterSampler::draw_value(spec, rng),
                };
                values.push((spec.name.clone(), value));
            }
            children.push(values.into_iter().collect());
        }
        Ok(children)
    }

    fn check(&self) -> RdeeResult<()> {
        if let ChildCount::Between { min, max } = self.children {
            if min > max {
                return Err(RdeeError::InvalidConfig(format!(
                    "child count range [{}, {}] is inverted",
                    min, max
                )));
            }
        }
        if let Perturbation::Local { scale } = self.perturbation {
            if !scale.is_finite() || scale < 0.0 {
                return Err(RdeeError::InvalidConfig(format!(
                    "perturbation scale must be a non-negative number, got {}",
                    scale
                )));
            }
        }
        Ok(())
    }
}

/// Runs a [`BranchPolicy`] and enforces the fan-out cap and bounds.
#[derive(Clone)]
pub struct BifurcationHandler {
    policy: Arc<dyn BranchPolicy>,
    max_fanout: u32,
}

impl BifurcationHandler {
    pub fn new(policy: Arc<dyn BranchPolicy>, max_fanout: u32) -> Self {
        Self { policy, max_fanout }
    }

    pub fn max_fanout(&self) -> u32 {
        self.max_fanout
    }

    pub fn policy(&self) -> &Arc<dyn BranchPolicy> {
        &self.policy
    }

    /// Children for a surviving node, in proposal order.
    ///
    /// `FanoutExceeded` and out-of-bounds children are branch-local errors:
    /// the caller marks the node faulted and moves on.
    pub fn branch(
        &self,
        node: &ExistenceNode,
        bounds: &ParameterBounds,
        rng: &mut RngState,
    ) -> RdeeResult<Vec<ParameterVector>> {
        let children = self.policy.propose(node, bounds, self.max_fanout, rng)?;
        if children.len() > self.max_fanout as usize {
            return Err(RdeeError::FanoutExceeded {
                requested: children.len(),
                max: self.max_fanout,
            });
        }
        for child in &children {
            bounds.check_vector(child)?;
        }
        Ok(children)
    }
}
