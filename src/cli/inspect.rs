//! Inspect command implementation.

use super::output::{JsonProgramSummary, format_summary};
use super::{CliError, OutputFormat};
use xgp::{Node, parse_json, parse_text};

/// Execute the inspect command.
///
/// Exactly one of `program` (text form) and `json` (JSON form) is given.
///
/// # Errors
///
/// Returns an error if the program does not parse.
pub(crate) fn execute(
    program: Option<&str>,
    json: Option<&str>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let node: Node = match (program, json) {
        (Some(text), None) => parse_text(text)?,
        (None, Some(doc)) => {
            let value = serde_json::from_str(doc)
                .map_err(|e| CliError::new(format!("Invalid JSON program: {e}")))?;
            parse_json(&value)?
        }
        _ => return Err(CliError::new("Pass exactly one of --program and --json")),
    };

    let summary = JsonProgramSummary::from_node(&node);
    match format {
        OutputFormat::Text => print!("{}", format_summary(&summary)),
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&summary)
                .map_err(|e| CliError::new(format!("Failed to encode summary: {e}")))?;
            println!("{text}");
        }
    }
    Ok(())
}
