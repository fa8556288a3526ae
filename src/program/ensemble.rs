//! Additive ensembles produced by the boosting flavor.
//!
//! The engine returns
//!
//! ```json
//! {"y_mean": 2.0, "programs": [{"op": {...}}, ...], "steps": [0.5, ...]}
//! ```
//!
//! and a prediction is `y_mean - Σ learning_rate * step * program(X)`.
//! The learning rate is not part of the document; it comes from the fit
//! configuration.

use crate::error::{Result, XgpError};
use crate::program::{Node, parse_json};
use ndarray::{Array1, ArrayView2};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct EnsembleDoc {
    y_mean: f64,
    programs: Vec<ProgramDoc>,
    steps: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ProgramDoc {
    op: Value,
}

/// A baseline plus an ordered sequence of weighted programs.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    baseline: f64,
    members: Vec<(Node, f64)>,
}

impl Ensemble {
    /// Build an ensemble from its parts.
    #[must_use]
    pub fn new(baseline: f64, members: Vec<(Node, f64)>) -> Self {
        Self { baseline, members }
    }

    /// Parse the ensemble JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::Schema`] if the document is not valid JSON, a
    /// field is missing, or `programs` and `steps` differ in length; program
    /// parse errors are passed through.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let doc: EnsembleDoc = serde_json::from_str(source)
            .map_err(|e| XgpError::Schema(format!("invalid ensemble document: {e}")))?;
        if doc.programs.len() != doc.steps.len() {
            return Err(XgpError::Schema(format!(
                "ensemble has {} programs but {} steps",
                doc.programs.len(),
                doc.steps.len()
            )));
        }
        let members = doc
            .programs
            .iter()
            .zip(doc.steps)
            .map(|(program, step)| Ok((parse_json(&program.op)?, step)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(doc.y_mean, members))
    }

    /// The scalar baseline every prediction starts from.
    #[must_use]
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Programs and their step weights, in order.
    #[must_use]
    pub fn members(&self) -> &[(Node, f64)] {
        &self.members
    }

    /// Number of programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the ensemble holds no programs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Evaluate over every row of `x`.
    ///
    /// Members are evaluated in parallel; their contributions are then
    /// subtracted from the baseline in sequence order, so results do not
    /// depend on scheduling.
    ///
    /// # Errors
    ///
    /// Returns the first member evaluation error.
    pub fn evaluate(&self, x: ArrayView2<'_, f64>, learning_rate: f64) -> Result<Array1<f64>> {
        let predictions = self
            .members
            .par_iter()
            .map(|(node, _)| node.evaluate(x))
            .collect::<Result<Vec<_>>>()?;

        let mut out = Array1::from_elem(x.nrows(), self.baseline);
        for (prediction, (_, step)) in predictions.iter().zip(&self.members) {
            out.scaled_add(-(learning_rate * step), prediction);
        }
        Ok(out)
    }
}
