//! Library discovery driven by the `XGP_LIBRARY` environment variable.
//!
//! Kept in its own test binary: it sets a process-wide variable.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use ndarray::array;
use tempfile::TempDir;
use xgp::boundary::LIBRARY_ENV;
use xgp::{Dataset, FitConfig, Model, NativeLibrary, SharedLibrary, Task, XgpError};

#[test]
fn test_explicit_library_overrides_discovery() {
    let dir = TempDir::new().unwrap();
    let junk = dir.path().join("libxgp_explicit.so");
    std::fs::write(&junk, b"not a shared object").unwrap();
    // SAFETY: this is the only test in this binary, so nothing else reads
    // or writes the environment concurrently.
    unsafe { std::env::set_var(LIBRARY_ENV, &junk) };

    let err = NativeLibrary::discover().unwrap_err();
    let XgpError::BoundaryCall(message) = err else {
        panic!("expected a boundary error, got {err:?}");
    };
    assert!(message.contains("libxgp_explicit.so"));

    // Failed discoveries are not cached; each attempt searches again.
    assert!(matches!(NativeLibrary::shared(), Err(XgpError::BoundaryCall(_))));
    assert!(matches!(NativeLibrary::shared(), Err(XgpError::BoundaryCall(_))));

    let train = Dataset::new(array![[1.0], [2.0]], Some(array![1.0, 2.0]), None).unwrap();
    let mut model = Model::new(Task::Regression, FitConfig::default());
    let err = model.fit(&SharedLibrary, &train, None, false).unwrap_err();
    assert!(matches!(err, XgpError::BoundaryCall(_)));
    assert!(!model.is_fitted());
}
