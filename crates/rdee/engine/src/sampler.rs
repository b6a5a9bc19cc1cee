//! Parameter sampler.

use crate::rng::RngState;
use rdee_types::{DistributionKind, ParameterBounds, ParameterSpec, ParameterVector, RdeeResult};

/// Draws parameter vectors from bounds using explicit generator state.
pub struct ParameterSampler;

impl ParameterSampler {
    /// Sample one vector and hand back the advanced generator.
    ///
    /// Parameters are drawn in declaration order, one draw each.
    pub fn sample(
        bounds: &ParameterBounds,
        mut rng: RngState,
    ) -> RdeeResult<(ParameterVector, RngState)> {
        let vector = Self::draw(bounds, &mut rng)?;
        Ok((vector, rng))
    }

    /// Sample one vector, advancing `rng` in place.
    pub fn draw(bounds: &ParameterBounds, rng: &mut RngState) -> RdeeResult<ParameterVector> {
        let mut values = Vec::with_capacity(bounds.len());
        for spec in bounds.iter() {
            spec.check()?;
            values.push((spec.name.clone(), Self::draw_value(spec, rng)));
        }
        Ok(values.into_iter().collect())
    }

    /// Draw a single value from a spec that has already been checked.
    pub fn draw_value(spec: &ParameterSpec, rng: &mut RngState) -> f64 {
        match spec.distribution {
            DistributionKind::Uniform => rng.uniform(spec.lower, spec.upper),
            DistributionKind::LogUniform => rng
                .uniform(spec.lower.ln(), spec.upper.ln())
                .exp()
                .max(spec.lower)
                .min(spec.upper),
        }
    }
}
