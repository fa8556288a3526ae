//! xgp CLI - fit symbolic models through the XGP engine and evaluate them.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// xgp - symbolic regression through the XGP engine
#[derive(Parser, Debug)]
#[command(name = "xgp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a model with the native engine and save it
    Fit {
        /// Training dataset (JSON with x, y and optional sample_weight)
        #[arg(short, long)]
        data: PathBuf,

        /// Validation dataset for early stopping
        #[arg(short, long)]
        eval: Option<PathBuf>,

        /// Fit configuration (JSON; missing fields use defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Learning task
        #[arg(short, long, default_value = "regression")]
        task: cli::TaskArg,

        /// Engine flavor (overrides the configuration)
        #[arg(short, long)]
        flavor: Option<cli::FlavorArg>,

        /// Engine library (default: XGP_LIBRARY or discovery)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Random state (overrides the configuration)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Where to write the fitted model
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Predict with a saved model
    Predict {
        /// Model file written by `fit`
        #[arg(short, long)]
        model: PathBuf,

        /// Dataset to predict on
        #[arg(short, long)]
        data: PathBuf,

        /// Output class-1 probabilities (classification only)
        #[arg(long)]
        proba: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Evaluate a text program on a dataset
    Eval {
        /// Program in text form, e.g. "add(X[0], 1)"
        #[arg(short, long)]
        program: String,

        /// Dataset to evaluate on
        #[arg(short, long)]
        data: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Show the canonical form and shape of a program
    Inspect {
        /// Program in text form
        #[arg(short, long, conflicts_with = "json", required_unless_present = "json")]
        program: Option<String>,

        /// Program in JSON form
        #[arg(short, long)]
        json: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_logging(args.verbose);

    let result = match args.command {
        Commands::Fit {
            data,
            eval,
            config,
            task,
            flavor,
            library,
            seed,
            output,
        } => cli::fit::execute(cli::fit::FitOptions {
            data,
            eval,
            config,
            task,
            flavor,
            library,
            seed,
            verbose: args.verbose,
            output,
        }),

        Commands::Predict {
            model,
            data,
            proba,
            format,
        } => cli::predict::execute(model, data, proba, format),

        Commands::Eval {
            program,
            data,
            format,
        } => cli::eval::execute(&program, data, format),

        Commands::Inspect {
            program,
            json,
            format,
        } => cli::inspect::execute(program.as_deref(), json.as_deref(), format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
