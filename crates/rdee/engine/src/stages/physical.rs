//! Built-in physical stage evaluators.
//!
//! Window-based stages score the fraction of satisfied criteria; the
//! chemical and evolutionary stages score a survival probability. The
//! windows are defaults for exploring the mechanics and make no claim about
//! physical truth.

use super::{StageInput, StageScore};
use crate::survival_filter::{survival_window, threshold_pass};
use rdee_types::{ParameterBounds, ParameterSpec, RdeeResult};

/// Inclusive window on one parameter. Either side may be open.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterWindow {
    pub parameter: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ParameterWindow {
    pub fn new(parameter: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            parameter: parameter.into(),
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn at_least(parameter: impl Into<String>, lower: f64) -> Self {
        Self {
            parameter: parameter.into(),
            lower: Some(lower),
            upper: None,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        threshold_pass(value, self.lower, self.upper)
    }
}

/// Check every window, recording a 1/0 diagnostic per parameter.
fn check_windows(
    windows: &[ParameterWindow],
    input: &StageInput<'_>,
    score: &mut StageScore,
) -> RdeeResult<usize> {
    let mut satisfied = 0;
    for window in windows {
        let ok = window.contains(input.require(&window.parameter)?);
        score
            .diagnostics
            .insert(window.parameter.clone(), if ok { 1.0 } else { 0.0 });
        if ok {
            satisfied += 1;
        }
    }
    Ok(satisfied)
}

fn fraction(satisfied: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        satisfied as f64 / total as f64
    }
}

fn window_names(windows: &[ParameterWindow]) -> Vec<String> {
    windows.iter().map(|w| w.parameter.clone()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CosmologicalEvaluator {
    pub windows: Vec<ParameterWindow>,
}

impl Default for CosmologicalEvaluator {
    fn default() -> Self {
        Self {
            windows: vec![
                ParameterWindow::new("hubble_constant", 60.0, 75.0),
                ParameterWindow::new("cosmological_constant", 1e-56, 1e-52),
                ParameterWindow::new("baryon_to_photon_ratio", 1e-10, 1e-9),
            ],
        }
    }
}

impl CosmologicalEvaluator {
    pub fn required_parameters(&self) -> Vec<String> {
        window_names(&self.windows)
    }

    pub fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore> {
        let mut score = StageScore::default();
        let satisfied = check_windows(&self.windows, input, &mut score)?;
        score.score = fraction(satisfied, self.windows.len());
        Ok(score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StellarEvaluator {
    pub windows: Vec<ParameterWindow>,
}

impl Default for StellarEvaluator {
    fn default() -> Self {
        Self {
            windows: vec![
                ParameterWindow::new("stellar_mass", 0.5, 1.5),
                ParameterWindow::new("stellar_metallicity", 0.001, 0.03),
            ],
        }
    }
}

impl StellarEvaluator {
    pub fn required_parameters(&self) -> Vec<String> {
        window_names(&self.windows)
    }

    pub fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore> {
        let mut score = StageScore::default();
        let satisfied = check_windows(&self.windows, input, &mut score)?;
        score.score = fraction(satisfied, self.windows.len());
        Ok(score)
    }
}

/// Habitable corridor: `target` within `reference * (1 ± ratio)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitableCorridor {
    pub reference: String,
    pub target: String,
    pub ratio: String,
}

impl Default for HabitableCorridor {
    fn default() -> Self {
        Self {
            reference: "planet_distance".into(),
            target: "liquid_water_zone_range".into(),
            ratio: "survival_corridor_sensitivity_window".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanetaryEvaluator {
    pub windows: Vec<ParameterWindow>,
    pub corridor: Option<HabitableCorridor>,
}

impl Default for PlanetaryEvaluator {
    fn default() -> Self {
        Self {
            windows: vec![
                ParameterWindow::new("planet_mass", 0.5, 5.0),
                ParameterWindow::new("planet_distance", 0.7, 2.0),
                ParameterWindow::at_least("planetary_system_multiplicity", 1.0),
            ],
            corridor: Some(HabitableCorridor::default()),
        }
    }
}

impl PlanetaryEvaluator {
    pub fn required_parameters(&self) -> Vec<String> {
        let mut names = window_names(&self.windows);
        if let Some(corridor) = &self.corridor {
            for name in [&corridor.reference, &corridor.target, &corridor.ratio] {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    pub fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore> {
        let mut score = StageScore::default();
        let mut satisfied = check_windows(&self.windows, input, &mut score)?;
        let mut total = self.windows.len();

        if let Some(corridor) = &self.corridor {
            let inside = survival_window(
                input.require(&corridor.reference)?,
                input.require(&corridor.target)?,
                input.require(&corridor.ratio)?,
            )?;
            score
                .diagnostics
                .insert("habitable_corridor".into(), if inside { 1.0 } else { 0.0 });
            total += 1;
            if inside {
                satisfied += 1;
            }
        }

        score.score = fraction(satisfied, total);
        Ok(score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChemicalEvaluator {
    pub synthesis: String,
    pub catalysis: String,
    pub failure_rate: String,
}

impl Default for ChemicalEvaluator {
    fn default() -> Self {
        Self {
            synthesis: "prebiotic_synthesis_success_probability".into(),
            catalysis: "uv_catalysis_efficiency".into(),
            failure_rate: "polymerization_failure_rate".into(),
        }
    }
}

impl ChemicalEvaluator {
    pub fn required_parameters(&self) -> Vec<String> {
        vec![
            self.synthesis.clone(),
            self.catalysis.clone(),
            self.failure_rate.clone(),
        ]
    }

    /// `synthesis × catalysis × (1 − failure_rate)`, clamped to `[0, 1]`.
    pub fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore> {
        let synthesis = input.require(&self.synthesis)?;
        let catalysis = input.require(&self.catalysis)?;
        let failure_rate = input.require(&self.failure_rate)?;
        let composite = (synthesis * catalysis * (1.0 - failure_rate)).clamp(0.0, 1.0);
        Ok(StageScore::new(composite).with_diagnostic("composite_success", composite))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionaryEvaluator {
    pub complexity: String,
    pub fragility: String,
    pub extinction_frequency: String,
    /// Complexity below this scores zero.
    pub min_complexity: f64,
    /// Extinction frequency at which survival drops to `1/e`.
    pub extinction_scale: f64,
}

impl Default for EvolutionaryEvaluator {
    fn default() -> Self {
        Self {
            complexity: "evolutionary_complexity_threshold".into(),
            fragility: "evolutionary_fragility_multiplier".into(),
            extinction_frequency: "mass_extinction_frequency".into(),
            min_complexity: 3.0,
            extinction_scale: 100.0,
        }
    }
}

impl EvolutionaryEvaluator {
    pub fn required_parameters(&self) -> Vec<String> {
        vec![
            self.complexity.clone(),
            self.fragility.clone(),
            self.extinction_frequency.clone(),
        ]
    }

    pub fn evaluate(&self, input: &StageInput<'_>) -> RdeeResult<StageScore> {
        let complexity = input.require(&self.complexity)?;
        let fragility = input.require(&self.fragility)?;
        let frequency = input.require(&self.extinction_frequency)?;

        let complexity_ok = complexity >= self.min_complexity;
        let fragility_survival = (1.0 - fragility).clamp(0.0, 1.0);
        let extinction_survival = (-frequency.max(0.0) / self.extinction_scale).exp();
        let probability = if complexity_ok {
            (fragility_survival * extinction_survival).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(StageScore::new(probability)
            .with_diagnostic("complexity_ok", if complexity_ok { 1.0 } else { 0.0 })
            .with_diagnostic("fragility_survival", fragility_survival)
            .with_diagnostic("extinction_survival", extinction_survival))
    }
}

/// Bounds covering every parameter the standard registry needs.
pub fn reference_bounds() -> RdeeResult<ParameterBounds> {
    ParameterBounds::new(vec![
        ParameterSpec::uniform("hubble_constant", 60.0, 75.0),
        ParameterSpec::log_uniform("cosmological_constant", 1e-56, 1e-52),
        ParameterSpec::log_uniform("baryon_to_photon_ratio", 1e-10, 1e-9),
        ParameterSpec::log_uniform("stellar_mass", 0.1, 100.0),
        ParameterSpec::log_uniform("stellar_metallicity", 0.0001, 0.03),
        ParameterSpec::log_uniform("planet_mass", 0.1, 10.0),
        ParameterSpec::log_uniform("planet_distance", 0.1, 10.0),
        ParameterSpec::uniform("planetary_system_multiplicity", 1.0, 20.0),
        ParameterSpec::uniform("liquid_water_zone_range", 0.5, 2.0),
        ParameterSpec::uniform("survival_corridor_sensitivity_window", 0.0, 0.5),
        ParameterSpec::uniform("prebiotic_synthesis_success_probability", 0.001, 1.0),
        ParameterSpec::uniform("uv_catalysis_efficiency", 0.0, 1.0),
        ParameterSpec::uniform("polymerization_failure_rate", 0.0, 1.0),
        ParameterSpec::uniform("evolutionary_complexity_threshold", 1.0, 10.0),
        ParameterSpec::uniform("evolutionary_fragility_multiplier", 0.0, 1.0),
        ParameterSpec::uniform("mass_extinction_frequency", 0.0, 100.0),
    ])
}
