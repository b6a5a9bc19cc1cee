//! Stage evaluator registry.
//!
//! Stages are held in an ordered table keyed by [`StageOrdinal`]; the node at
//! depth `d` is evaluated by stage `d`. Built-in physical evaluators are enum
//! variants dispatched by `match`, and anything else plugs in through
//! [`StageEvaluator::Custom`]. Extending the chain means registering another
//! definition, never editing an existing one.

pub mod physical;

pub use physical::{
    reference_bounds, ChemicalEvaluator, CosmologicalEvaluator, EvolutionaryEvaluator,
    HabitableCorridor, ParameterWindow, PlanetaryEvaluator, StellarEvaluator,
};

use crate::survival_filter::{StageThreshold, SurvivalCurve};
use rdee_types::{ExistenceNode, ParameterBounds, ParameterVector, RdeeError, RdeeResult, StageOrdinal};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What an evaluator sees.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub stage: StageOrdinal,
    pub parameters: &'a ParameterVector,
    /// The surviving parent, `None` at the root.
    pub parent: Option<&'a ExistenceNode>,
}

impl StageInput<'_> {
    /// Look up a parameter the evaluator requires.
    pub fn require(&self, name: &str) -> RdeeResult<f64> {
        self.parameters
            .get(name)
            .ok_or_else(|| RdeeError::MissingParameter {
                stage: self.stage,
                parameter: name.to_string(),
            })
    }
}

/// Score plus per-criterion diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageScore {
    pub score: f64,
    pub diagnostics: BTreeMap<String, f64>,
}

impl StageScore {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn with_diagnostic(mut self, key: impl Into<String>, value: f64) -> Self {
        self.diagnostics.insert(key.into(), value);
        self
    }
}

/// A pluggable stage evaluator.
///
/// Evaluators must be pure functions of their input: the same parameters and
/// parent always give the same score.
pub trait EvaluateStage: Send + Sync {
    /// Parameters that must be bounded for this stage to run.
    fn required_parameters(&self) -> Vec<String>;

    fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore>;
}

type EvalFn = dyn Fn(&StageInput<'_>) -> RdeeResult<StageScore> + Send + Sync;

struct FnEvaluator {
    required: Vec<String>,
    f: Box<EvalFn>,
}

impl EvaluateStage for FnEvaluator {
    fn required_parameters(&self) -> Vec<String> {
        self.required.clone()
    }

    fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore> {
        (self.f)(input)
    }
}

/// Stage evaluator variants.
#[derive(Clone)]
pub enum StageEvaluator {
    Cosmological(CosmologicalEvaluator),
    Stellar(StellarEvaluator),
    Planetary(PlanetaryEvaluator),
    Chemical(ChemicalEvaluator),
    Evolutionary(EvolutionaryEvaluator),
    Custom(Arc<dyn EvaluateStage>),
}

impl StageEvaluator {
    /// Wrap a closure as a custom evaluator.
    pub fn from_fn<F>(required: &[&str], f: F) -> Self
    where
        F: Fn(&StageInput<'_>) -> RdeeResult<StageScore> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(FnEvaluator {
            required: required.iter().map(|s| s.to_string()).collect(),
            f: Box::new(f),
        }))
    }

    pub fn required_parameters(&self) -> Vec<String> {
        match self {
            Self::Cosmological(e) => e.required_parameters(),
            Self::Stellar(e) => e.required_parameters(),
            Self::Planetary(e) => e.required_parameters(),
            Self::Chemical(e) => e.required_parameters(),
            Self::Evolutionary(e) => e.required_parameters(),
            Self::Custom(e) => e.required_parameters(),
        }
    }

    pub fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore> {
        match self {
            Self::Cosmological(e) => e.evaluate(input),
            Self::Stellar(e) => e.evaluate(input),
            Self::Planetary(e) => e.evaluate(input),
            Self::Chemical(e) => e.evaluate(input),
            Self::Evolutionary(e) => e.evaluate(input),
            Self::Custom(e) => e.evaluate(input),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cosmological(_) => "cosmological",
            Self::Stellar(_) => "stellar",
            Self::Planetary(_) => "planetary",
            Self::Chemical(_) => "chemical",
            Self::Evolutionary(_) => "evolutionary",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for StageEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StageEvaluator").field(&self.kind()).finish()
    }
}

/// One registered stage.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    pub name: String,
    pub evaluator: StageEvaluator,
    pub threshold: StageThreshold,
}

impl StageDefinition {
    pub fn new(name: impl Into<String>, evaluator: StageEvaluator, threshold: StageThreshold) -> Self {
        Self {
            name: name.into(),
            evaluator,
            threshold,
        }
    }
}

/// Ordered table of stages.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    stages: Vec<StageDefinition>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five physical stages with their default windows.
    ///
    /// Window stages require every criterion to hold; the chemical and
    /// evolutionary stages score a probability and survive by a draw.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(StageDefinition::new(
            "cosmological",
            StageEvaluator::Cosmological(CosmologicalEvaluator::default()),
            StageThreshold::new(1.0),
        ));
        registry.register(StageDefinition::new(
            "stellar",
            StageEvaluator::Stellar(StellarEvaluator::default()),
            StageThreshold::new(1.0),
        ));
        registry.register(StageDefinition::new(
            "planetary",
            StageEvaluator::Planetary(PlanetaryEvaluator::default()),
            StageThreshold::new(1.0),
        ));
        registry.register(StageDefinition::new(
            "chemical",
            StageEvaluator::Chemical(ChemicalEvaluator::default()),
            StageThreshold::stochastic(SurvivalCurve::Linear),
        ));
        registry.register(StageDefinition::new(
            "evolutionary",
            StageEvaluator::Evolutionary(EvolutionaryEvaluator::default()),
            StageThreshold::stochastic(SurvivalCurve::Linear),
        ));
        registry
    }

    /// Append a stage, returning its ordinal.
    pub fn register(&mut self, definition: StageDefinition) -> StageOrdinal {
        let ordinal = self.stages.len() as StageOrdinal;
        tracing::debug!(
            stage = ordinal,
            name = %definition.name,
            evaluator = definition.evaluator.kind(),
            "registered stage"
        );
        self.stages.push(definition);
        ordinal
    }

    pub fn with_stage(mut self, definition: StageDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn get(&self, stage: StageOrdinal) -> RdeeResult<&StageDefinition> {
        self.stages
            .get(stage as usize)
            .ok_or(RdeeError::UnknownStage(stage))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    /// Evaluate `stage` for a node's parameters.
    pub fn evaluate(
        &self,
        stage: StageOrdinal,
        parent: Option<&ExistenceNode>,
        parameters: &ParameterVector,
    ) -> RdeeResult<StageScore> {
        let definition = self.get(stage)?;
        let input = StageInput {
            stage,
            parameters,
            parent,
        };
        for name in definition.evaluator.required_parameters() {
            input.require(&name)?;
        }
        let score = definition.evaluator.evaluate(&input).map_err(|e| match e {
            RdeeError::InvalidConfig(message) => RdeeError::Evaluator { stage, message },
            other => other,
        })?;
        // Non-finite values serialize as null and would not load back.
        if let Some((key, value)) = score.diagnostics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RdeeError::Evaluator {
                stage,
                message: format!("diagnostic '{}' is not finite ({})", key, value),
            });
        }
        Ok(score)
    }

    /// Check that the first `levels` stages can run against `bounds`.
    ///
    /// Runs before any sampling; every error here is a configuration error
    /// that halts the run.
    pub fn validate_against(&self, bounds: &ParameterBounds, levels: u32) -> RdeeResult<()> {
        if levels as usize > self.stages.len() {
            return Err(RdeeError::InvalidConfig(format!(
                "max_depth {} exceeds the {} registered stages",
                levels,
                self.stages.len()
            )));
        }
        for (ordinal, definition) in self.stages.iter().take(levels as usize).enumerate() {
            let stage = ordinal as StageOrdinal;
            definition.threshold.check(stage)?;
            for parameter in definition.evaluator.required_parameters() {
                if !bounds.contains_parameter(&parameter) {
                    return Err(RdeeError::MissingParameter { stage, parameter });
                }
            }
        }
        Ok(())
    }
}
