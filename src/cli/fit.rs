//! Fit command implementation.

use super::{CliError, FlavorArg, TaskArg, load_dataset};
use log::info;
use std::path::PathBuf;
use xgp::{FitConfig, FitRoutine, Model, NativeLibrary, SharedLibrary, save_model};

/// Options for the fit command.
#[derive(Debug)]
pub(crate) struct FitOptions {
    /// Training dataset.
    pub(crate) data: PathBuf,
    /// Optional validation dataset.
    pub(crate) eval: Option<PathBuf>,
    /// Optional configuration document.
    pub(crate) config: Option<PathBuf>,
    /// Learning task.
    pub(crate) task: TaskArg,
    /// Overrides the configured flavor.
    pub(crate) flavor: Option<FlavorArg>,
    /// Explicit engine library.
    pub(crate) library: Option<PathBuf>,
    /// Overrides the configured random state.
    pub(crate) seed: Option<u64>,
    /// Ask the engine to report progress.
    pub(crate) verbose: bool,
    /// Where to write the fitted model.
    pub(crate) output: PathBuf,
}

/// Execute the fit command.
///
/// # Errors
///
/// Returns an error if loading inputs, the engine call or saving fails.
pub(crate) fn execute(options: FitOptions) -> Result<(), CliError> {
    let mut config = match &options.config {
        Some(path) => FitConfig::from_json_file(path)?,
        None => FitConfig::default(),
    };
    if let Some(flavor) = options.flavor {
        config.flavor = flavor.into();
    }
    if options.seed.is_some() {
        config.random_state = options.seed;
    }

    let train = load_dataset(&options.data)?;
    let eval = options.eval.as_deref().map(load_dataset).transpose()?;
    info!(
        "training on {} rows x {} features",
        train.n_rows(),
        train.n_features()
    );

    let explicit;
    let routine: &dyn FitRoutine = match &options.library {
        Some(path) => {
            explicit = NativeLibrary::open(path)?;
            &explicit
        }
        None => &SharedLibrary,
    };

    let mut model = Model::new(options.task.into(), config);
    model.fit(routine, &train, eval.as_ref(), options.verbose)?;
    save_model(&model, &options.output)?;

    println!("Program: {}", model.program_source()?);
    println!("Saved model to {}", options.output.display());
    Ok(())
}
