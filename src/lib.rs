// Allow unwrap and float comparisons in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::float_cmp))]
//! XGP: host-side bindings to the XGP symbolic regression engine.
//!
//! The engine evolves programs in native code. This crate provides:
//! - Marshaling of arrays and strings into the engine's Go ABI records
//! - A single synchronous call into the engine's `Fit` entry point
//! - Parsers for the programs it returns (text, JSON, boosted ensembles)
//! - A vectorized evaluator for those programs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Model (fit / predict / save)    │
//! ├──────────────────┬──────────────────┤
//! │  Boundary call   │  Program parse   │
//! │  (marshal, Fit)  │  and evaluation  │
//! ├──────────────────┴──────────────────┤
//! │   Native engine (libxgp, via cgo)   │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use xgp::program::parse_text;
//!
//! let program = parse_text("div(X[0], sub(X[1], X[1]))").unwrap();
//! let x = array![[3.0, 2.0]];
//! assert_eq!(program.evaluate(x.view()).unwrap()[0], 1.0);
//! ```

pub mod boundary;
pub mod config;
pub mod data;
pub mod error;
pub mod marshal;
pub mod model;
pub mod persist;
pub mod program;

pub use boundary::{FitRoutine, NativeLibrary, RawRoutine, SharedLibrary};
pub use config::{FitConfig, Flavor, ProgramFormat, Task};
pub use data::Dataset;
pub use error::{Result, XgpError};
pub use model::{Model, Predictor};
pub use persist::{load_model, save_model};
pub use program::{Ensemble, Node, Op, parse_json, parse_text};
