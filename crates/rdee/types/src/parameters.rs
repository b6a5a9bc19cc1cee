//! Parameter bounds and sampled parameter vectors.
//!
//! [`ParameterBounds`] is built once from already-validated input and shared
//! read-only by every stage and worker. Its declaration order is the sampling
//! order, so it is part of the reproducibility contract.

use crate::error::{RdeeError, RdeeResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Distribution a parameter is drawn from inside its bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    #[default]
    Uniform,
    /// Uniform in `ln(value)`. Requires a strictly positive lower bound.
    LogUniform,
}

/// One bounded parameter: `(name, lower, upper, distribution)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub distribution: DistributionKind,
}

impl ParameterSpec {
    pub fn uniform(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            distribution: DistributionKind::Uniform,
        }
    }

    pub fn log_uniform(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            distribution: DistributionKind::LogUniform,
        }
    }

    /// Check this parameter's own invariants.
    pub fn check(&self) -> RdeeResult<()> {
        if self.name.trim().is_empty() {
            return Err(RdeeError::invalid_bounds("<unnamed>", "parameter name is empty"));
        }
        if !self.lower.is_finite() || !self.upper.is_finite() {
            return Err(RdeeError::invalid_bounds(
                &self.name,
                format!("bounds must be finite, got [{}, {}]", self.lower, self.upper),
            ));
        }
        if self.lower > self.upper {
            return Err(RdeeError::invalid_bounds(
                &self.name,
                format!(
                    "lower bound {} exceeds upper bound {}",
                    self.lower, self.upper
                ),
            ));
        }
        if self.distribution == DistributionKind::LogUniform && self.lower <= 0.0 {
            return Err(RdeeError::invalid_bounds(
                &self.name,
                format!(
                    "log-uniform bounds must be strictly positive, got lower {}",
                    self.lower
                ),
            ));
        }
        Ok(())
    }

    /// Inclusive containment test.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Validated, ordered set of parameter specs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ParameterSpec>", into = "Vec<ParameterSpec>")]
pub struct ParameterBounds {
    specs: Vec<ParameterSpec>,
}

impl ParameterBounds {
    /// Build bounds, failing with `InvalidBounds` on the first bad spec.
    pub fn new(specs: impl IntoIterator<Item = ParameterSpec>) -> RdeeResult<Self> {
        let specs: Vec<ParameterSpec> = specs.into_iter().collect();
        let mut seen = HashSet::new();
        for spec in &specs {
            spec.check()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(RdeeError::invalid_bounds(
                    &spec.name,
                    "parameter declared more than once",
                ));
            }
        }
        Ok(Self { specs })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.specs.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn contains_parameter(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Check that `vector` assigns an in-bounds value to every parameter.
    pub fn check_vector(&self, vector: &ParameterVector) -> RdeeResult<()> {
        for spec in &self.specs {
            match vector.get(&spec.name) {
                None => {
                    return Err(RdeeError::invalid_bounds(
                        &spec.name,
                        "value missing from parameter vector",
                    ))
                }
                Some(value) if !spec.contains(value) => {
                    return Err(RdeeError::invalid_bounds(
                        &spec.name,
                        format!(
                            "value {} outside [{}, {}]",
                            value, spec.lower, spec.upper
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<ParameterSpec>> for ParameterBounds {
    type Error = RdeeError;

    fn try_from(specs: Vec<ParameterSpec>) -> Result<Self, Self::Error> {
        Self::new(specs)
    }
}

impl From<ParameterBounds> for Vec<ParameterSpec> {
    fn from(bounds: ParameterBounds) -> Self {
        bounds.specs
    }
}

/// Sampled values keyed by parameter name.
///
/// Backed by a `BTreeMap` so iteration and serialization order never depend
/// on hashing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterVector(BTreeMap<String, f64>);

impl ParameterVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ParameterVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
