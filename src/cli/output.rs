//! Output formatting utilities for CLI.

use super::{CliError, OutputFormat};
use ndarray::ArrayView1;
use serde::Serialize;
use xgp::Node;

/// JSON-serializable predictions.
#[derive(Debug, Serialize)]
struct JsonPredictions {
    /// One value per input row.
    predictions: Vec<f64>,
}

/// JSON-serializable program summary.
#[derive(Debug, Serialize)]
pub(super) struct JsonProgramSummary {
    /// Canonical text form.
    pub(super) program: String,
    /// Total number of nodes.
    pub(super) nodes: usize,
    /// Height of the tree (a leaf has height 0).
    pub(super) height: usize,
    /// Highest feature index referenced, if any.
    pub(super) max_feature: Option<usize>,
    /// JSON program form.
    pub(super) json: serde_json::Value,
}

impl JsonProgramSummary {
    /// Summarize a parsed program.
    pub(super) fn from_node(node: &Node) -> Self {
        Self {
            program: node.to_string(),
            nodes: node.node_count(),
            height: node.height(),
            max_feature: node.max_variable_index(),
            json: node.to_json(),
        }
    }
}

/// Render predictions in the requested format.
pub(super) fn format_predictions(
    values: ArrayView1<'_, f64>,
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for v in values {
                output.push_str(&v.to_string());
                output.push('\n');
            }
            Ok(output)
        }
        OutputFormat::Json => {
            let doc = JsonPredictions {
                predictions: values.to_vec(),
            };
            serde_json::to_string(&doc)
                .map_err(|e| CliError::new(format!("Failed to encode predictions: {e}")))
        }
    }
}

/// Format a program summary as human-readable text.
pub(super) fn format_summary(summary: &JsonProgramSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("Program: {}\n", summary.program));
    output.push_str(&format!("  Nodes:  {}\n", summary.nodes));
    output.push_str(&format!("  Height: {}\n", summary.height));
    match summary.max_feature {
        Some(i) => output.push_str(&format!("  Uses features up to X[{i}]\n")),
        None => output.push_str("  Uses no features\n"),
    }
    output.push_str(&format!("  JSON:   {}\n", summary.json));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_format_predictions() {
        let values = array![1.5, -2.0];
        assert_eq!(
            format_predictions(values.view(), OutputFormat::Text).unwrap(),
            "1.5\n-2\n"
        );
        assert_eq!(
            format_predictions(values.view(), OutputFormat::Json).unwrap(),
            r#"{"predictions":[1.5,-2.0]}"#
        );
    }

    #[test]
    fn test_format_summary() {
        let node = xgp::parse_text("add(X[2], 1)").unwrap();
        let text = format_summary(&JsonProgramSummary::from_node(&node));
        assert!(text.contains("Program: add(X[2], 1)"));
        assert!(text.contains("Nodes:  3"));
        assert!(text.contains("Height: 1"));
        assert!(text.contains("X[2]"));
    }
}
