//! Predict command implementation.

use super::output::format_predictions;
use super::{CliError, OutputFormat, load_dataset};
use std::path::PathBuf;
use xgp::load_model;

/// Execute the predict command.
///
/// # Errors
///
/// Returns an error if the model or data cannot be loaded or evaluation
/// fails.
pub(crate) fn execute(
    model: PathBuf,
    data: PathBuf,
    proba: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let model = load_model(&model)
        .map_err(|e| CliError::new(format!("Failed to load {}: {e}", model.display())))?;
    let data = load_dataset(&data)?;

    let values = if proba {
        model.predict_proba(data.x())?
    } else {
        model.predict(data.x())?
    };
    print!("{}", format_predictions(values.view(), format)?);
    Ok(())
}
