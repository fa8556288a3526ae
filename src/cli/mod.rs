//! CLI command implementations for xgp.

pub(crate) mod eval;
pub(crate) mod fit;
pub(crate) mod inspect;
pub(crate) mod predict;

mod output;

use clap::ValueEnum;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::error::Error;
use std::fmt;
use std::path::Path;
use xgp::{Dataset, XgpError};

/// Output format for commands that print predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// One value per line.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Task selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TaskArg {
    /// Symbolic regression.
    Regression,
    /// Binary classification.
    Classification,
}

impl From<TaskArg> for xgp::Task {
    fn from(task: TaskArg) -> Self {
        match task {
            TaskArg::Regression => Self::Regression,
            TaskArg::Classification => Self::Classification,
        }
    }
}

/// Engine flavor selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FlavorArg {
    /// A single program.
    Vanilla,
    /// A boosted ensemble.
    Boosting,
}

impl From<FlavorArg> for xgp::Flavor {
    fn from(flavor: FlavorArg) -> Self {
        match flavor {
            FlavorArg::Vanilla => Self::Vanilla,
            FlavorArg::Boosting => Self::Boosting,
        }
    }
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<XgpError> for CliError {
    fn from(e: XgpError) -> Self {
        Self::new(e.to_string())
    }
}

/// Read a dataset file, naming the file in the error.
pub(crate) fn load_dataset(path: &Path) -> Result<Dataset, CliError> {
    Dataset::from_json_file(path)
        .map_err(|e| CliError::new(format!("Failed to load {}: {e}", path.display())))
}

/// Writes log records to stderr.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                Level::Error => "error",
                Level::Warn => "warn",
                Level::Info => "info",
                Level::Debug => "debug",
                Level::Trace => "trace",
            };
            eprintln!("[{level}] {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the stderr logger: `Info` when verbose, `Warn` otherwise.
pub(crate) fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    // Only fails if a logger is already installed, which leaves that one in place.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
