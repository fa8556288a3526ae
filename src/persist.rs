//! Saving and loading fitted models.
//!
//! A model file is a JSON document holding the engine's program source
//! verbatim plus what is needed to evaluate it again:
//!
//! ```json
//! {"format_version": 1, "task": "regression", "format": "text",
//!  "config": {...}, "source": "add(X[0], 1)"}
//! ```
//!
//! Ensemble shrinkage is read from `config.learning_rate`.
//!
//! Loading re-parses the source, so a file that loads is a file that
//! predicts.

use crate::config::{FitConfig, ProgramFormat, Task};
use crate::error::{Result, XgpError};
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current model file version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    task: Task,
    format: ProgramFormat,
    config: FitConfig,
    source: String,
}

/// Write a fitted model to `path`.
///
/// # Errors
///
/// Returns [`XgpError::NotFitted`] for an unfitted model, [`XgpError::Io`]
/// if the file cannot be written and [`XgpError::Persist`] if encoding
/// fails.
pub fn save_model(model: &Model, path: &Path) -> Result<()> {
    let file = ModelFile {
        format_version: FORMAT_VERSION,
        task: model.task(),
        format: model.program_format()?,
        config: model.config().clone(),
        source: model.program_source()?.to_string(),
    };
    let text = serde_json::to_string_pretty(&file)
        .map_err(|e| XgpError::Persist(format!("cannot encode model: {e}")))?;
    fs::write(path, text)?;
    Ok(())
}

/// Read a model written by [`save_model`].
///
/// # Errors
///
/// Returns [`XgpError::Io`] if the file cannot be read,
/// [`XgpError::Persist`] for a malformed document or an unsupported
/// version, and propagates program parse errors.
pub fn load_model(path: &Path) -> Result<Model> {
    let text = fs::read_to_string(path)?;
    let file: ModelFile = serde_json::from_str(&text)
        .map_err(|e| XgpError::Persist(format!("{}: {e}", path.display())))?;
    if file.format_version != FORMAT_VERSION {
        return Err(XgpError::Persist(format!(
            "unsupported model format version: {}",
            file.format_version
        )));
    }
    Model::from_source(file.task, file.config, file.format, file.source)
}
