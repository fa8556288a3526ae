//! Eval command implementation.

use super::output::format_predictions;
use super::{CliError, OutputFormat, load_dataset};
use std::path::PathBuf;
use xgp::parse_text;

/// Execute the eval command.
///
/// # Errors
///
/// Returns an error if the program does not parse, the data cannot be
/// loaded or evaluation fails.
pub(crate) fn execute(program: &str, data: PathBuf, format: OutputFormat) -> Result<(), CliError> {
    let node = parse_text(program)?;
    let data = load_dataset(&data)?;
    let values = node.evaluate(data.x())?;
    print!("{}", format_predictions(values.view(), format)?);
    Ok(())
}
