//! Survival filter: turns a stage score into a verdict.
//!
//! The threshold gate is a closed lower bound, so a score exactly at
//! `min_score` survives. Under a stochastic rule a score past the gate still
//! has to win a draw from the node's generator against `curve(score)`.

use crate::rng::RngState;
use rdee_types::{CollapseCause, RdeeError, RdeeResult, StageOrdinal, Verdict};
use serde::{Deserialize, Serialize};

/// Maps a score to a survival probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "snake_case")]
pub enum SurvivalCurve {
    /// `p = score`
    Linear,
    /// `p = 1 / (1 + exp(-steepness * (score - midpoint)))`
    Logistic { midpoint: f64, steepness: f64 },
    /// `p = 1 - factor`, independent of the score.
    Fragility { factor: f64 },
}

impl SurvivalCurve {
    pub fn probability(&self, score: f64) -> f64 {
        let p = match *self {
            Self::Linear => score,
            Self::Logistic {
                midpoint,
                steepness,
            } => 1.0 / (1.0 + (-steepness * (score - midpoint)).exp()),
            Self::Fragility { factor } => 1.0 - factor,
        };
        p.clamp(0.0, 1.0)
    }

    fn check(&self, stage: StageOrdinal) -> RdeeResult<()> {
        match *self {
            Self::Linear => Ok(()),
            Self::Logistic {
                midpoint,
                steepness,
            } => {
                if midpoint.is_finite() && steepness.is_finite() && steepness > 0.0 {
                    Ok(())
                } else {
                    Err(RdeeError::InvalidConfig(format!(
                        "stage {}: logistic curve needs finite midpoint and positive steepness",
                        stage
                    )))
                }
            }
            Self::Fragility { factor } => {
                validate_probability(factor).map(|_| ()).map_err(|_| {
                    RdeeError::InvalidConfig(format!(
                        "stage {}: fragility factor {} outside [0, 1]",
                        stage, factor
                    ))
                })
            }
        }
    }
}

/// How a score past the threshold becomes a survival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PassRule {
    /// Deterministic: passing the threshold is surviving.
    #[default]
    Threshold,
    /// Survive iff a uniform draw falls below `curve(score)`.
    Stochastic { curve: SurvivalCurve },
}

/// Per-stage survival criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageThreshold {
    pub min_score: f64,
    #[serde(default)]
    pub rule: PassRule,
}

impl StageThreshold {
    pub fn new(min_score: f64) -> Self {
        Self {
            min_score,
            rule: PassRule::Threshold,
        }
    }

    pub fn with_rule(mut self, rule: PassRule) -> Self {
        self.rule = rule;
        self
    }

    /// Stochastic rule with no threshold gate.
    pub fn stochastic(curve: SurvivalCurve) -> Self {
        Self::new(0.0).with_rule(PassRule::Stochastic { curve })
    }

    pub fn check(&self, stage: StageOrdinal) -> RdeeResult<()> {
        if !self.min_score.is_finite() || !(0.0..=1.0).contains(&self.min_score) {
            return Err(RdeeError::InvalidConfig(format!(
                "stage {}: min_score {} outside [0, 1]",
                stage, self.min_score
            )));
        }
        match &self.rule {
            PassRule::Threshold => Ok(()),
            PassRule::Stochastic { curve } => curve.check(stage),
        }
    }
}

impl Default for StageThreshold {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// Result of filtering one score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterDecision {
    /// `Survived` or `Collapsed`.
    pub verdict: Verdict,
    pub pass_probability: f64,
    pub cause: Option<CollapseCause>,
}

impl FilterDecision {
    pub fn survived(&self) -> bool {
        self.verdict == Verdict::Survived
    }

    fn collapsed(cause: CollapseCause, pass_probability: f64) -> Self {
        Self {
            verdict: Verdict::Collapsed,
            pass_probability,
            cause: Some(cause),
        }
    }
}

pub struct SurvivalFilter;

impl SurvivalFilter {
    /// Decide survival for `score` at `stage`.
    ///
    /// Consumes one draw from `rng` only when a stochastic rule reaches its
    /// draw.
    pub fn decide(
        stage: StageOrdinal,
        score: f64,
        threshold: &StageThreshold,
        rng: &mut RngState,
    ) -> RdeeResult<FilterDecision> {
        let score =
            validate_probability(score).map_err(|_| RdeeError::MalformedScore { stage, score })?;

        if score < threshold.min_score {
            return Ok(FilterDecision::collapsed(CollapseCause::BelowThreshold, 0.0));
        }

        match &threshold.rule {
            PassRule::Threshold => Ok(FilterDecision {
                verdict: Verdict::Survived,
                pass_probability: 1.0,
                cause: None,
            }),
            PassRule::Stochastic { curve } => {
                let p = curve.probability(score);
                if rng.unit() < p {
                    Ok(FilterDecision {
                        verdict: Verdict::Survived,
                        pass_probability: p,
                        cause: None,
                    })
                } else {
                    Ok(FilterDecision::collapsed(CollapseCause::StochasticCull, p))
                }
            }
        }
    }
}

/// Inclusive range test; either bound may be absent.
pub fn threshold_pass(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    if let Some(min) = min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            return false;
        }
    }
    true
}

/// True if `target` lies within `reference * (1 ± ratio)`.
pub fn survival_window(reference: f64, target: f64, ratio: f64) -> RdeeResult<bool> {
    if ratio < 0.0 || !ratio.is_finite() {
        return Err(RdeeError::InvalidConfig(format!(
            "window ratio must be a non-negative number, got {}",
            ratio
        )));
    }
    let a = reference * (1.0 - ratio);
    let b = reference * (1.0 + ratio);
    let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
    Ok(lower <= target && target <= upper)
}

/// Return `p` if it is a finite probability.
pub fn validate_probability(p: f64) -> RdeeResult<f64> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(RdeeError::InvalidConfig(format!(
            "{} is not a probability in [0, 1]",
            p
        )))
    }
}
