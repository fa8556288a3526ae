//! Engine call tests against in-process fake engines.
//!
//! Each fake has the exact `Fit` signature, records what it received and
//! returns a static C string, so the whole fit path runs without a native
//! library.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::ffi::c_char;

use ndarray::array;
use xgp::boundary::{FitArguments, FitFn};
use xgp::marshal::{GoFloat64Matrix, GoFloat64Slice, GoString};
use xgp::{
    Dataset, FitConfig, FitRoutine, Flavor, Model, NativeLibrary, RawRoutine, Task, XgpError,
};

#[derive(Debug, Clone)]
struct Captured {
    x_train: Vec<Vec<f64>>,
    y_train: Vec<f64>,
    w_train: Vec<f64>,
    x_val: Vec<Vec<f64>>,
    y_val: Vec<f64>,
    w_val: Vec<f64>,
    flavor: String,
    loss_metric: String,
    eval_metric: String,
    funcs: String,
    n_individuals: u64,
    learning_rate: f64,
    seed: i64,
    verbose: bool,
}

thread_local! {
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

fn take_captured() -> Option<Captured> {
    CAPTURED.with(|c| c.borrow_mut().take())
}

fn matrix(m: GoFloat64Matrix) -> Vec<Vec<f64>> {
    // SAFETY: only called from inside a fake engine call.
    let slices = unsafe { m.slices() };
    slices
        .iter()
        .map(|s| unsafe { s.as_slice() }.to_vec())
        .collect()
}

fn slice(s: GoFloat64Slice) -> Vec<f64> {
    assert_eq!(s.len(), s.capacity());
    // SAFETY: only called from inside a fake engine call.
    unsafe { s.as_slice() }.to_vec()
}

fn string(s: GoString) -> String {
    // SAFETY: only called from inside a fake engine call.
    String::from_utf8(unsafe { s.as_bytes() }.to_vec()).unwrap()
}

macro_rules! fake_engine {
    ($name:ident, $output:expr) => {
        #[allow(clippy::too_many_arguments)]
        unsafe extern "C" fn $name(
            x_train: GoFloat64Matrix,
            y_train: GoFloat64Slice,
            w_train: GoFloat64Slice,
            x_val: GoFloat64Matrix,
            y_val: GoFloat64Slice,
            w_val: GoFloat64Slice,
            flavor: GoString,
            loss_metric: GoString,
            eval_metric: GoString,
            _parsimony_coefficient: f64,
            _polish_best: bool,
            funcs: GoString,
            _const_min: f64,
            _const_max: f64,
            _p_constant: f64,
            _p_full: f64,
            _p_terminal: f64,
            _min_height: u64,
            _max_height: u64,
            _n_populations: u64,
            n_individuals: u64,
            _n_generations: u64,
            _p_hoist_mutation: f64,
            _p_sub_tree_mutation: f64,
            _p_point_mutation: f64,
            _point_mutation_rate: f64,
            _p_sub_tree_crossover: f64,
            _n_rounds: u64,
            _n_early_stopping_rounds: u64,
            learning_rate: f64,
            _line_search: bool,
            seed: i64,
            verbose: bool,
        ) -> *const c_char {
            let captured = Captured {
                x_train: matrix(x_train),
                y_train: slice(y_train),
                w_train: slice(w_train),
                x_val: matrix(x_val),
                y_val: slice(y_val),
                w_val: slice(w_val),
                flavor: string(flavor),
                loss_metric: string(loss_metric),
                eval_metric: string(eval_metric),
                funcs: string(funcs),
                n_individuals,
                learning_rate,
                seed,
                verbose,
            };
            CAPTURED.with(|c| *c.borrow_mut() = Some(captured));
            $output
        }
    };
}

fake_engine!(text_engine, c"mul(X[0], 2)".as_ptr());
fake_engine!(
    ensemble_engine,
    c"{\"y_mean\": 1.0, \"programs\": [{\"op\": {\"type\": \"var\", \"value\": \"1\"}}], \"steps\": [1.0]}"
        .as_ptr()
);
fake_engine!(null_engine, std::ptr::null());
fake_engine!(binary_engine, c"\xff\xfe".as_ptr());
fake_engine!(bad_program_engine, c"tan(X[0])".as_ptr());

fn train_set() -> Dataset {
    Dataset::new(
        array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
        Some(array![2.0, 6.0, 10.0]),
        None,
    )
    .unwrap()
}

fn seeded() -> FitConfig {
    FitConfig {
        random_state: Some(42),
        ..FitConfig::default()
    }
}

#[test]
fn test_vanilla_fit_marshals_arguments() {
    let config = seeded();
    let expected_seed = config.resolve_seed();
    let mut model = Model::new(Task::Regression, config);
    model
        .fit(&RawRoutine(text_engine), &train_set(), None, false)
        .unwrap();

    let c = take_captured().unwrap();
    assert_eq!(c.x_train, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    assert_eq!(c.y_train, vec![2.0, 6.0, 10.0]);
    assert!(c.w_train.is_empty());
    assert!(c.x_val.is_empty());
    assert!(c.y_val.is_empty());
    assert!(c.w_val.is_empty());
    assert_eq!(c.flavor, "vanilla");
    assert_eq!(c.loss_metric, "mae");
    assert_eq!(c.eval_metric, "");
    assert_eq!(c.funcs, "add,sub,mul,div");
    assert_eq!(c.n_individuals, 100);
    assert_eq!(c.learning_rate, 0.08);
    assert_eq!(c.seed, expected_seed);
    assert!(!c.verbose);

    assert_eq!(model.program_source().unwrap(), "mul(X[0], 2)");
    let x = array![[1.0, 0.0], [-4.0, 0.0]];
    assert_eq!(model.predict(x.view()).unwrap(), array![2.0, -8.0]);
}

#[test]
fn test_boosting_fit_with_validation_set() {
    let config = FitConfig {
        flavor: Flavor::Boosting,
        learning_rate: 0.5,
        loss_metric: Some("mse".into()),
        eval_metric: Some("r2".into()),
        ..seeded()
    };
    let train = Dataset::new(
        array![[1.0, 2.0], [3.0, 4.0]],
        Some(array![0.5, 1.5]),
        Some(array![1.0, 2.0]),
    )
    .unwrap();
    let val = Dataset::new(array![[7.0, 8.0]], Some(array![3.0]), None).unwrap();

    let mut model = Model::new(Task::Regression, config);
    model
        .fit(&RawRoutine(ensemble_engine), &train, Some(&val), true)
        .unwrap();

    let c = take_captured().unwrap();
    assert_eq!(c.flavor, "boosting");
    assert_eq!(c.loss_metric, "mse");
    assert_eq!(c.eval_metric, "r2");
    assert_eq!(c.w_train, vec![1.0, 2.0]);
    assert_eq!(c.x_val, vec![vec![7.0], vec![8.0]]);
    assert_eq!(c.y_val, vec![3.0]);
    assert!(c.w_val.is_empty());
    assert!(c.verbose);

    // 1 - 0.5 * 1.0 * X[1]
    let x = array![[0.0, 2.0], [0.0, -1.0]];
    assert_eq!(model.predict(x.view()).unwrap(), array![0.0, 1.5]);
}

#[test]
fn test_classification_uses_logloss() {
    let train = Dataset::new(array![[1.0], [2.0]], Some(array![0.0, 1.0]), None).unwrap();
    let mut model = Model::new(Task::Classification, seeded());
    model
        .fit(&RawRoutine(text_engine), &train, None, false)
        .unwrap();
    assert_eq!(take_captured().unwrap().loss_metric, "logloss");

    let x = array![[-1.0], [1.0]];
    assert_eq!(model.predict(x.view()).unwrap(), array![0.0, 1.0]);
}

#[test]
fn test_rejected_inputs_never_reach_the_engine() {
    take_captured();

    let multiclass = Dataset::new(array![[1.0], [2.0], [3.0]], Some(array![0.0, 1.0, 2.0]), None)
        .unwrap();
    let mut model = Model::new(Task::Classification, seeded());
    let err = model
        .fit(&RawRoutine(text_engine), &multiclass, None, false)
        .unwrap_err();
    assert!(matches!(err, XgpError::InvalidData(_)));

    let mut model = Model::new(
        Task::Regression,
        FitConfig {
            p_full: 2.0,
            ..seeded()
        },
    );
    let err = model
        .fit(&RawRoutine(text_engine), &train_set(), None, false)
        .unwrap_err();
    assert!(matches!(err, XgpError::InvalidConfig(_)));

    let narrow = Dataset::new(array![[1.0]], Some(array![1.0]), None).unwrap();
    let mut model = Model::new(Task::Regression, seeded());
    let err = model
        .fit(&RawRoutine(text_engine), &train_set(), Some(&narrow), false)
        .unwrap_err();
    assert!(matches!(err, XgpError::InvalidData(_)));

    let unlabeled = Dataset::features(array![[1.0]]);
    let err = model
        .fit(&RawRoutine(text_engine), &unlabeled, None, false)
        .unwrap_err();
    assert!(matches!(err, XgpError::InvalidData(_)));

    assert!(take_captured().is_none());
    assert!(!model.is_fitted());
}

/// A routine whose entry point can never be resolved.
#[derive(Debug)]
struct Unresolvable;

impl FitRoutine for Unresolvable {
    fn entry_point(&self) -> xgp::Result<FitFn> {
        Err(XgpError::BoundaryCall("no engine linked".into()))
    }
}

#[test]
fn test_unresolved_entry_point_fails_before_the_call() {
    take_captured();
    let mut model = Model::new(Task::Regression, seeded());
    let err = model
        .fit(&Unresolvable, &train_set(), None, false)
        .unwrap_err();
    assert!(matches!(err, XgpError::BoundaryCall(_)));
    assert!(!model.is_fitted());
    assert!(take_captured().is_none());
}

#[test]
fn test_null_output_is_a_boundary_error() {
    let mut model = Model::new(Task::Regression, seeded());
    let err = model
        .fit(&RawRoutine(null_engine), &train_set(), None, false)
        .unwrap_err();
    assert!(matches!(err, XgpError::BoundaryCall(_)));
    assert!(!model.is_fitted());
}

#[test]
fn test_non_utf8_output_is_an_encoding_error() {
    let mut model = Model::new(Task::Regression, seeded());
    let err = model
        .fit(&RawRoutine(binary_engine), &train_set(), None, false)
        .unwrap_err();
    assert!(matches!(err, XgpError::Encoding(_)));
}

#[test]
fn test_failed_fit_keeps_previous_program() {
    let mut model = Model::from_source(
        Task::Regression,
        seeded(),
        xgp::ProgramFormat::Text,
        "X[1]",
    )
    .unwrap();
    let err = model
        .fit(&RawRoutine(bad_program_engine), &train_set(), None, false)
        .unwrap_err();
    assert!(matches!(err, XgpError::UnknownOperator(_)));
    assert_eq!(model.program_source().unwrap(), "X[1]");
}

#[test]
fn test_fit_arguments_keep_buffers() {
    let train = train_set();
    let config = seeded();
    let args = FitArguments::new(&train, None, &config, "mae", 7, false).unwrap();
    assert_eq!(args.x_train().to_array(), train.x());
    assert_eq!(args.x_val().shape(), (0, 0));
    assert_eq!(args.seed(), 7);
}

#[test]
fn test_open_rejects_non_library() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("libxgp.so");
    std::fs::write(&path, b"not a shared object").unwrap();
    let err = NativeLibrary::open(&path).unwrap_err();
    assert!(matches!(err, XgpError::BoundaryCall(_)));
}
