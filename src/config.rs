//! Fit configuration, engine flavor and learning task.

// Seeds are drawn below 2^24 so the casts are exact
#![allow(clippy::cast_possible_wrap)]

use crate::error::{Result, XgpError};
use crate::program::Op;
use ndarray::Array1;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound (exclusive) of the seeds handed to the engine.
pub const SEED_BOUND: u64 = 1 << 24;

/// Which search the engine runs, which also decides its output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// A single program, returned as text.
    #[default]
    Vanilla,
    /// A boosted ensemble of programs, returned as JSON.
    Boosting,
}

impl Flavor {
    /// Name passed to the engine.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vanilla => "vanilla",
            Self::Boosting => "boosting",
        }
    }

    /// Format of the program the engine returns for this flavor.
    #[must_use]
    pub const fn output_format(self) -> ProgramFormat {
        match self {
            Self::Vanilla => ProgramFormat::Text,
            Self::Boosting => ProgramFormat::Ensemble,
        }
    }
}

/// Serialized program formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramFormat {
    /// `add(X[0], 3.5)`.
    Text,
    /// A JSON program document.
    Json,
    /// A JSON ensemble document.
    Ensemble,
}

/// The learning task, which fixes the default loss and the output transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Real-valued targets; predictions are the raw program output.
    #[default]
    Regression,
    /// Binary targets; predictions are thresholded sigmoid outputs.
    Classification,
}

impl Task {
    /// Loss metric used when the configuration does not name one.
    #[must_use]
    pub const fn default_loss(self) -> &'static str {
        match self {
            Self::Regression => "mae",
            Self::Classification => "logloss",
        }
    }

    /// Turn raw program output into predictions.
    #[must_use]
    pub fn post_process(self, raw: Array1<f64>) -> Array1<f64> {
        match self {
            Self::Regression => raw,
            Self::Classification => {
                raw.mapv_into(|v| if sigmoid(v) > 0.5 { 1.0 } else { 0.0 })
            }
        }
    }

    /// Class-1 probabilities, for classification only.
    #[must_use]
    pub fn probabilities(self, raw: Array1<f64>) -> Option<Array1<f64>> {
        match self {
            Self::Regression => None,
            Self::Classification => Some(raw.mapv_into(sigmoid)),
        }
    }
}

/// Logistic function.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Every parameter forwarded to the engine, in call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Engine flavor.
    pub flavor: Flavor,
    /// Loss metric; the task default when `None`.
    pub loss_metric: Option<String>,
    /// Metric tracked on the validation set; the loss when `None`.
    pub eval_metric: Option<String>,
    /// Penalty per unit of program height.
    pub parsimony_coefficient: f64,
    /// Whether to tune the constants of the best program.
    pub polish_best: bool,
    /// Comma-separated operator names the engine may use.
    pub funcs: String,
    /// Lower bound for generated constants.
    pub const_min: f64,
    /// Upper bound for generated constants.
    pub const_max: f64,
    /// Probability of generating a constant instead of a variable.
    pub p_constant: f64,
    /// Probability of full (vs. grow) initialization.
    pub p_full: f64,
    /// Probability of generating a terminal node.
    pub p_terminal: f64,
    /// Minimum initial program height.
    pub min_height: usize,
    /// Maximum initial program height.
    pub max_height: usize,
    /// Number of populations.
    pub n_populations: usize,
    /// Individuals per population.
    pub n_individuals: usize,
    /// Generations per search.
    pub n_generations: usize,
    /// Probability of hoist mutation.
    pub p_hoist_mutation: f64,
    /// Probability of sub-tree mutation.
    pub p_sub_tree_mutation: f64,
    /// Probability of point mutation.
    pub p_point_mutation: f64,
    /// Per-node probability of changing an operator during point mutation.
    pub point_mutation_rate: f64,
    /// Probability of sub-tree crossover.
    pub p_sub_tree_crossover: f64,
    /// Boosting rounds.
    pub n_rounds: usize,
    /// Rounds without validation improvement before stopping.
    pub n_early_stopping_rounds: usize,
    /// Shrinkage applied to each boosted program.
    pub learning_rate: f64,
    /// Whether the engine line-searches each step weight.
    pub line_search: bool,
    /// Seed for the engine's RNG; entropy when `None`.
    pub random_state: Option<u64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::Vanilla,
            loss_metric: None,
            eval_metric: None,
            parsimony_coefficient: 0.000_01,
            polish_best: true,
            funcs: "add,sub,mul,div".to_string(),
            const_min: -5.0,
            const_max: 5.0,
            p_constant: 0.5,
            p_full: 0.5,
            p_terminal: 0.3,
            min_height: 3,
            max_height: 5,
            n_populations: 1,
            n_individuals: 100,
            n_generations: 30,
            p_hoist_mutation: 0.1,
            p_sub_tree_mutation: 0.1,
            p_point_mutation: 0.1,
            point_mutation_rate: 0.5,
            p_sub_tree_crossover: 0.3,
            n_rounds: 100,
            n_early_stopping_rounds: 5,
            learning_rate: 0.08,
            line_search: true,
            random_state: None,
        }
    }
}

impl FitConfig {
    /// Load a configuration document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::Io`] if the file cannot be read and
    /// [`XgpError::InvalidConfig`] if it cannot be decoded.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| XgpError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    /// Check ranges and the operator list.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::InvalidConfig`] for non-finite or out-of-range
    /// values and [`XgpError::UnknownOperator`] for unregistered names in `funcs`.
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("p_constant", self.p_constant),
            ("p_full", self.p_full),
            ("p_terminal", self.p_terminal),
            ("p_hoist_mutation", self.p_hoist_mutation),
            ("p_sub_tree_mutation", self.p_sub_tree_mutation),
            ("p_point_mutation", self.p_point_mutation),
            ("point_mutation_rate", self.point_mutation_rate),
            ("p_sub_tree_crossover", self.p_sub_tree_crossover),
        ];
        let reals = [
            ("const_min", self.const_min),
            ("const_max", self.const_max),
            ("parsimony_coefficient", self.parsimony_coefficient),
            ("learning_rate", self.learning_rate),
        ];
        for (name, v) in reals {
            if !v.is_finite() {
                return Err(XgpError::InvalidConfig(format!(
                    "{name} must be finite, got {v}"
                )));
            }
        }
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(XgpError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {p}"
                )));
            }
        }
        if self.const_min > self.const_max {
            return Err(XgpError::InvalidConfig(format!(
                "const_min ({}) exceeds const_max ({})",
                self.const_min, self.const_max
            )));
        }
        if self.min_height > self.max_height {
            return Err(XgpError::InvalidConfig(format!(
                "min_height ({}) exceeds max_height ({})",
                self.min_height, self.max_height
            )));
        }
        if self.n_populations == 0 || self.n_individuals == 0 {
            return Err(XgpError::InvalidConfig(
                "n_populations and n_individuals must be positive".into(),
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(XgpError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for name in self.operator_names() {
            Op::from_name(name)?;
        }
        Ok(())
    }

    /// Names listed in `funcs`, trimmed, empty entries skipped.
    pub fn operator_names(&self) -> impl Iterator<Item = &str> {
        self.funcs.split(',').map(str::trim).filter(|s| !s.is_empty())
    }

    /// The loss sent to the engine for `task`.
    #[must_use]
    pub fn resolved_loss(&self, task: Task) -> &str {
        match self.loss_metric.as_deref() {
            Some(loss) if !loss.is_empty() => loss,
            _ => task.default_loss(),
        }
    }

    /// Draw the engine seed from `random_state`.
    #[must_use]
    pub fn resolve_seed(&self) -> i64 {
        let mut rng = match self.random_state {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        rng.gen_range(0..SEED_BOUND) as i64
    }
}
