//! Estimator wrapper: fit through the engine, then predict locally.
//!
//! A [`Model`] holds a task and a configuration. Fitting performs exactly
//! one engine call and installs the decoded program; prediction only
//! evaluates that program and never touches the engine again.

use crate::boundary::{FitArguments, FitRoutine, invoke};
use crate::config::{FitConfig, ProgramFormat, Task};
use crate::data::Dataset;
use crate::error::{Result, XgpError};
use crate::program::{Ensemble, Node, parse_json, parse_text};
use log::{debug, info};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// A decoded program ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictor {
    /// One expression tree.
    Single(Node),
    /// A boosted ensemble.
    Ensemble(Ensemble),
}

impl Predictor {
    /// Decode `source` according to `format`.
    ///
    /// # Errors
    ///
    /// Propagates parse errors; a JSON program that is not valid JSON is
    /// [`XgpError::Schema`].
    pub fn parse(format: ProgramFormat, source: &str) -> Result<Self> {
        match format {
            ProgramFormat::Text => parse_text(source).map(Self::Single),
            ProgramFormat::Json => {
                let doc = serde_json::from_str(source)
                    .map_err(|e| XgpError::Schema(format!("invalid program document: {e}")))?;
                parse_json(&doc).map(Self::Single)
            }
            ProgramFormat::Ensemble => Ensemble::from_json_str(source).map(Self::Ensemble),
        }
    }

    /// Raw output for every row of `x`.
    ///
    /// # Errors
    ///
    /// Propagates evaluation errors.
    pub fn evaluate(&self, x: ArrayView2<'_, f64>, learning_rate: f64) -> Result<Array1<f64>> {
        match self {
            Self::Single(node) => node.evaluate(x),
            Self::Ensemble(ensemble) => ensemble.evaluate(x, learning_rate),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Fitted {
    format: ProgramFormat,
    source: String,
    predictor: Predictor,
}

/// A symbolic regressor or binary classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    task: Task,
    config: FitConfig,
    fitted: Option<Fitted>,
}

impl Model {
    /// An unfitted model.
    #[must_use]
    pub fn new(task: Task, config: FitConfig) -> Self {
        Self {
            task,
            config,
            fitted: None,
        }
    }

    /// A model whose program was obtained elsewhere, e.g. a stored engine
    /// output.
    ///
    /// # Errors
    ///
    /// Propagates parse errors from [`Predictor::parse`].
    pub fn from_source(
        task: Task,
        config: FitConfig,
        format: ProgramFormat,
        source: impl Into<String>,
    ) -> Result<Self> {
        let source = source.into();
        let predictor = Predictor::parse(format, &source)?;
        Ok(Self {
            task,
            config,
            fitted: Some(Fitted {
                format,
                source,
                predictor,
            }),
        })
    }

    /// Fit through one engine call.
    ///
    /// On any error the model keeps whatever program it had before.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::InvalidConfig`] or [`XgpError::UnknownOperator`]
    /// for a bad configuration, [`XgpError::InvalidData`] for unusable
    /// data, and propagates boundary and parse errors.
    pub fn fit(
        &mut self,
        routine: &dyn FitRoutine,
        train: &Dataset,
        eval_set: Option<&Dataset>,
        verbose: bool,
    ) -> Result<()> {
        self.config.validate()?;
        if train.n_rows() == 0 {
            return Err(XgpError::InvalidData("training set is empty".into()));
        }
        if self.task == Task::Classification {
            check_binary(train.targets()?)?;
        }

        let loss = self.config.resolved_loss(self.task);
        let seed = self.config.resolve_seed();
        debug!("fitting {:?} with loss {loss} and seed {seed}", self.task);
        let args = FitArguments::new(train, eval_set, &self.config, loss, seed, verbose)?;
        let source = invoke(routine, &args)?;

        let format = self.config.flavor.output_format();
        let predictor = Predictor::parse(format, &source)?;
        info!("installed {format:?} program ({} bytes)", source.len());
        self.fitted = Some(Fitted {
            format,
            source,
            predictor,
        });
        Ok(())
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted.as_ref().ok_or(XgpError::NotFitted)
    }

    /// Raw program output.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::NotFitted`] before a successful fit and
    /// propagates evaluation errors.
    pub fn predict_raw(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.fitted()?
            .predictor
            .evaluate(x, self.config.learning_rate)
    }

    /// Predictions after the task's post-processing.
    ///
    /// # Errors
    ///
    /// See [`Model::predict_raw`].
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        Ok(self.task.post_process(self.predict_raw(x)?))
    }

    /// Class-1 probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::InvalidConfig`] for regression models, otherwise
    /// see [`Model::predict_raw`].
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let raw = self.predict_raw(x)?;
        self.task.probabilities(raw).ok_or_else(|| {
            XgpError::InvalidConfig("probabilities are only defined for classification".into())
        })
    }

    /// The program exactly as the engine returned it.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::NotFitted`] before a successful fit.
    pub fn program_source(&self) -> Result<&str> {
        Ok(&self.fitted()?.source)
    }

    /// Format of the installed program.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::NotFitted`] before a successful fit.
    pub fn program_format(&self) -> Result<ProgramFormat> {
        Ok(self.fitted()?.format)
    }

    /// The decoded program.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::NotFitted`] before a successful fit.
    pub fn predictor(&self) -> Result<&Predictor> {
        Ok(&self.fitted()?.predictor)
    }

    /// Whether a program is installed.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// The learning task.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// The fit configuration.
    #[must_use]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }
}

fn check_binary(y: ArrayView1<'_, f64>) -> Result<()> {
    let mut classes = y.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup_by(|a, b| a.total_cmp(b).is_eq());
    if classes.len() > 2 {
        return Err(XgpError::InvalidData(format!(
            "binary classification needs at most 2 classes, found {}",
            classes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flavor;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_unfitted_model() {
        let model = Model::new(Task::Regression, FitConfig::default());
        let x = array![[1.0]];
        assert!(!model.is_fitted());
        assert!(matches!(model.predict(x.view()), Err(XgpError::NotFitted)));
        assert!(matches!(model.program_source(), Err(XgpError::NotFitted)));
    }

    #[test]
    fn test_from_source_text() {
        let model = Model::from_source(
            Task::Regression,
            FitConfig::default(),
            ProgramFormat::Text,
            "mul(X[0], 2)",
        )
        .unwrap();
        let x = array![[1.0], [-3.0]];
        assert_eq!(model.predict(x.view()).unwrap(), array![2.0, -6.0]);
        assert_eq!(model.program_source().unwrap(), "mul(X[0], 2)");
        assert!(matches!(
            model.predict_proba(x.view()),
            Err(XgpError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_source_ensemble() {
        let config = FitConfig {
            flavor: Flavor::Boosting,
            learning_rate: 0.1,
            ..FitConfig::default()
        };
        let source = r#"{"y_mean": 2.0, "programs": [{"op": {"type": "var", "value": 0, "operands": []}}], "steps": [0.5]}"#;
        let model =
            Model::from_source(Task::Regression, config, ProgramFormat::Ensemble, source).unwrap();
        let x = array![[1.0]];
        assert_abs_diff_eq!(model.predict(x.view()).unwrap()[0], 1.95, epsilon = 1e-12);
    }

    #[test]
    fn test_classification_outputs() {
        let model = Model::from_source(
            Task::Classification,
            FitConfig::default(),
            ProgramFormat::Json,
            r#"{"type": "var", "value": 0, "operands": []}"#,
        )
        .unwrap();
        let x = array![[-2.0], [3.0]];
        assert_eq!(model.predict(x.view()).unwrap(), array![0.0, 1.0]);
        let proba = model.predict_proba(x.view()).unwrap();
        assert!(proba[0] < 0.5 && proba[1] > 0.5);
    }

    #[test]
    fn test_bad_source_is_rejected() {
        let err = Model::from_source(
            Task::Regression,
            FitConfig::default(),
            ProgramFormat::Text,
            "tan(X[0])",
        )
        .unwrap_err();
        assert!(matches!(err, XgpError::UnknownOperator(_)));
    }

    #[test]
    fn test_check_binary() {
        check_binary(array![0.0, 1.0, 1.0, 0.0].view()).unwrap();
        check_binary(array![1.0, 1.0].view()).unwrap();
        assert!(matches!(
            check_binary(array![0.0, 1.0, 2.0].view()),
            Err(XgpError::InvalidData(_))
        ));
    }
}
