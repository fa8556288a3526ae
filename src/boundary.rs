//! The single synchronous call into the native XGP engine.
//!
//! The engine is a shared library exporting one cgo function, `Fit`. This
//! module resolves it ([`NativeLibrary`]), marshals the call arguments in
//! their fixed positional order ([`FitArguments`]) and decodes the
//! returned C string ([`invoke`]).
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │  FitArguments (owns every buffer)     │
//! ├───────────────────────────────────────┤
//! │  FitRoutine → FitFn (resolved once)   │
//! ├───────────────────────────────────────┤
//! │  Fit(...) → *const c_char → String    │
//! └───────────────────────────────────────┘
//! ```

use crate::config::FitConfig;
use crate::data::Dataset;
use crate::error::{Result, XgpError};
use crate::marshal::{
    GoFloat64Matrix, GoFloat64Slice, GoString, MarshaledMatrix, MarshaledSlice, MarshaledString,
};
use libloading::Library;
use log::{debug, info, warn};
use std::ffi::{CStr, c_char};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable naming the engine library explicitly.
pub const LIBRARY_ENV: &str = "XGP_LIBRARY";

/// Exported symbol of the engine's entry point.
pub const FIT_SYMBOL: &[u8] = b"Fit\0";

/// Extensions the engine library may carry.
const LIBRARY_EXTENSIONS: [&str; 4] = ["so", "dylib", "dll", "pyd"];

/// Signature of the engine's `Fit` export, in call order.
pub type FitFn = unsafe extern "C" fn(
    x_train: GoFloat64Matrix,
    y_train: GoFloat64Slice,
    w_train: GoFloat64Slice,
    x_val: GoFloat64Matrix,
    y_val: GoFloat64Slice,
    w_val: GoFloat64Slice,
    flavor: GoString,
    loss_metric: GoString,
    eval_metric: GoString,
    parsimony_coefficient: f64,
    polish_best: bool,
    funcs: GoString,
    const_min: f64,
    const_max: f64,
    p_constant: f64,
    p_full: f64,
    p_terminal: f64,
    min_height: u64,
    max_height: u64,
    n_populations: u64,
    n_individuals: u64,
    n_generations: u64,
    p_hoist_mutation: f64,
    p_sub_tree_mutation: f64,
    p_point_mutation: f64,
    point_mutation_rate: f64,
    p_sub_tree_crossover: f64,
    n_rounds: u64,
    n_early_stopping_rounds: u64,
    learning_rate: f64,
    line_search: bool,
    seed: i64,
    verbose: bool,
) -> *const c_char;

/// Something that can hand out the engine's entry point.
pub trait FitRoutine {
    /// Resolve the entry point.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::BoundaryCall`] if it cannot be resolved.
    fn entry_point(&self) -> Result<FitFn>;
}

/// A loaded engine library and its resolved entry point.
pub struct NativeLibrary {
    path: PathBuf,
    fit: FitFn,
    // Keeps `fit` valid; must outlive it.
    _library: Library,
}

static SHARED: OnceLock<NativeLibrary> = OnceLock::new();

impl NativeLibrary {
    /// Load the library at `path` and resolve `Fit`.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::BoundaryCall`] if the library cannot be loaded
    /// or does not export `Fit`.
    pub fn open(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initializers; the engine
        // library has no initializers with preconditions on the host.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            XgpError::BoundaryCall(format!("cannot load {}: {e}", path.display()))
        })?;
        // SAFETY: `FitFn` matches the cgo export's C signature.
        let fit = unsafe { library.get::<FitFn>(FIT_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|e| {
                XgpError::BoundaryCall(format!("{} does not export Fit: {e}", path.display()))
            })?;
        debug!("resolved Fit in {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            fit,
            _library: library,
        })
    }

    /// Find and load the engine library.
    ///
    /// `XGP_LIBRARY` wins if set; otherwise the candidates from
    /// [`candidate_paths`] are tried in order and the first that loads is
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::BoundaryCall`] if nothing loads.
    pub fn discover() -> Result<Self> {
        let explicit = std::env::var_os(LIBRARY_ENV).map(PathBuf::from);
        Self::discover_from(explicit.as_deref(), &candidate_paths())
    }

    /// Load `explicit` if given, otherwise the first of `candidates` that
    /// loads.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::BoundaryCall`] if the explicit library fails to
    /// load or no candidate loads.
    pub fn discover_from(explicit: Option<&Path>, candidates: &[PathBuf]) -> Result<Self> {
        match explicit {
            Some(path) => Self::open(path),
            None => first_loadable(candidates, Self::open),
        }
    }

    /// Process-wide handle, discovered on first use.
    ///
    /// Once a library has been found, later calls return it without
    /// searching again. Failed discoveries are not cached.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::BoundaryCall`] if discovery fails.
    pub fn shared() -> Result<&'static Self> {
        get_or_discover(&SHARED, Self::discover)
    }

    /// Path the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("fit", &(self.fit as *const ()))
            .finish_non_exhaustive()
    }
}

impl FitRoutine for NativeLibrary {
    fn entry_point(&self) -> Result<FitFn> {
        Ok(self.fit)
    }
}

/// Resolves through [`NativeLibrary::shared`] at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedLibrary;

impl FitRoutine for SharedLibrary {
    fn entry_point(&self) -> Result<FitFn> {
        NativeLibrary::shared()?.entry_point()
    }
}

/// A bare entry point, for engines linked into the process.
#[derive(Clone, Copy)]
pub struct RawRoutine(pub FitFn);

impl fmt::Debug for RawRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawRoutine")
            .field(&(self.0 as *const ()))
            .finish()
    }
}

impl FitRoutine for RawRoutine {
    fn entry_point(&self) -> Result<FitFn> {
        Ok(self.0)
    }
}

/// Candidate library files: `xgp*` or `libxgp*` with a known extension,
/// next to the executable, in its parent and grandparent, and in the
/// working directory.
#[must_use]
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.extend(exe_dir.ancestors().take(3).map(Path::to_path_buf));
    }
    if let Ok(cwd) = std::env::current_dir()
        && !dirs.contains(&cwd)
    {
        dirs.push(cwd);
    }
    candidates_in(&dirs)
}

/// Library candidates in `dirs`, directory by directory, sorted by name
/// within each. Unreadable directories are skipped.
#[must_use]
pub fn candidates_in(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_library_candidate(path))
            .collect();
        found.sort();
        candidates.extend(found);
    }
    candidates
}

/// Try `candidates` in order and keep the first that `open` accepts.
fn first_loadable<T>(candidates: &[PathBuf], open: impl Fn(&Path) -> Result<T>) -> Result<T> {
    for path in candidates {
        debug!("trying engine library candidate {}", path.display());
        match open(path) {
            Ok(lib) => return Ok(lib),
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }
    Err(XgpError::BoundaryCall(format!(
        "cannot find an XGP library ({} candidate(s) tried); set {LIBRARY_ENV}",
        candidates.len()
    )))
}

/// Return the value in `slot`, running `discover` only while it is empty.
fn get_or_discover<T>(slot: &OnceLock<T>, discover: impl FnOnce() -> Result<T>) -> Result<&T> {
    if let Some(value) = slot.get() {
        return Ok(value);
    }
    let value = discover()?;
    Ok(slot.get_or_init(|| value))
}

fn is_library_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let stem_ok = name.starts_with("xgp") || name.starts_with("libxgp");
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| LIBRARY_EXTENSIONS.contains(&e));
    stem_ok && ext_ok
}

/// Every argument of one `Fit` call, marshaled and owned.
///
/// Headers are built from these buffers immediately before the call and
/// never outlive it.
#[derive(Debug)]
pub struct FitArguments {
    x_train: MarshaledMatrix,
    y_train: MarshaledSlice,
    w_train: MarshaledSlice,
    x_val: MarshaledMatrix,
    y_val: MarshaledSlice,
    w_val: MarshaledSlice,
    flavor: MarshaledString,
    loss_metric: MarshaledString,
    eval_metric: MarshaledString,
    funcs: MarshaledString,
    config: FitConfig,
    seed: i64,
    verbose: bool,
}

impl FitArguments {
    /// Marshal a training set, an optional validation set and the config.
    ///
    /// Absent weights and validation data become zero-length slices and a
    /// zero-shape matrix.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::InvalidData`] if a dataset lacks targets or the
    /// validation set has a different number of features.
    pub fn new(
        train: &Dataset,
        eval: Option<&Dataset>,
        config: &FitConfig,
        loss_metric: &str,
        seed: i64,
        verbose: bool,
    ) -> Result<Self> {
        let y_train = train.targets()?;
        let (x_val, y_val, w_val) = match eval {
            Some(val) => {
                if val.n_features() != train.n_features() {
                    return Err(XgpError::InvalidData(format!(
                        "validation set has {} features, training set has {}",
                        val.n_features(),
                        train.n_features()
                    )));
                }
                (
                    MarshaledMatrix::new(val.x()),
                    MarshaledSlice::new(val.targets()?),
                    MarshaledSlice::optional(val.sample_weight()),
                )
            }
            None => (
                MarshaledMatrix::empty(),
                MarshaledSlice::empty(),
                MarshaledSlice::empty(),
            ),
        };

        Ok(Self {
            x_train: MarshaledMatrix::new(train.x()),
            y_train: MarshaledSlice::new(y_train),
            w_train: MarshaledSlice::optional(train.sample_weight()),
            x_val,
            y_val,
            w_val,
            flavor: MarshaledString::new(config.flavor.name()),
            loss_metric: MarshaledString::new(loss_metric),
            eval_metric: MarshaledString::new(config.eval_metric.as_deref().unwrap_or("")),
            funcs: MarshaledString::new(&config.funcs),
            config: config.clone(),
            seed,
            verbose,
        })
    }

    /// Marshaled training features.
    #[must_use]
    pub fn x_train(&self) -> &MarshaledMatrix {
        &self.x_train
    }

    /// Marshaled validation features (zero-shape when absent).
    #[must_use]
    pub fn x_val(&self) -> &MarshaledMatrix {
        &self.x_val
    }

    /// Seed forwarded to the engine.
    #[must_use]
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Issue the call.
    ///
    /// # Safety
    ///
    /// `fit` must point to a function with the [`FitFn`] signature that
    /// does not retain the argument buffers past its return.
    unsafe fn call(&self, fit: FitFn) -> *const c_char {
        let c = &self.config;
        // SAFETY: every header points into a buffer owned by `self`,
        // which is borrowed until the call returns.
        unsafe {
            fit(
                self.x_train.header(),
                self.y_train.header(),
                self.w_train.header(),
                self.x_val.header(),
                self.y_val.header(),
                self.w_val.header(),
                self.flavor.header(),
                self.loss_metric.header(),
                self.eval_metric.header(),
                c.parsimony_coefficient,
                c.polish_best,
                self.funcs.header(),
                c.const_min,
                c.const_max,
                c.p_constant,
                c.p_full,
                c.p_terminal,
                c.min_height as u64,
                c.max_height as u64,
                c.n_populations as u64,
                c.n_individuals as u64,
                c.n_generations as u64,
                c.p_hoist_mutation,
                c.p_sub_tree_mutation,
                c.p_point_mutation,
                c.point_mutation_rate,
                c.p_sub_tree_crossover,
                c.n_rounds as u64,
                c.n_early_stopping_rounds as u64,
                c.learning_rate,
                c.line_search,
                self.seed,
                self.verbose,
            )
        }
    }
}

/// Perform one blocking engine call and decode its output.
///
/// The entry point is resolved before anything is sent. The returned
/// buffer is copied out immediately; it stays owned by the engine.
///
/// # Errors
///
/// Returns [`XgpError::BoundaryCall`] if the entry point cannot be
/// resolved or the engine returns a null buffer, and
/// [`XgpError::Encoding`] if the output is not UTF-8.
pub fn invoke(routine: &dyn FitRoutine, args: &FitArguments) -> Result<String> {
    let fit = routine.entry_point()?;
    let (rows, cols) = args.x_train.shape();
    info!(
        "calling XGP engine: {rows} rows, {cols} features, flavor {}",
        args.config.flavor.name()
    );
    debug!(
        "validation shape {:?}, seed {}, loss {:?}",
        args.x_val.shape(),
        args.seed,
        String::from_utf8_lossy(args.loss_metric.as_bytes())
    );

    // SAFETY: `fit` was resolved with the `FitFn` signature and the engine
    // copies its inputs before returning.
    let raw = unsafe { args.call(fit) };
    if raw.is_null() {
        return Err(XgpError::BoundaryCall("engine returned a null buffer".into()));
    }
    // SAFETY: the engine returns a NUL-terminated C string it never frees.
    let bytes = unsafe { CStr::from_ptr(raw) }.to_bytes().to_vec();
    info!("XGP engine returned {} bytes", bytes.len());
    decode_output(bytes)
}

/// Interpret the engine's output buffer as UTF-8.
///
/// # Errors
///
/// Returns [`XgpError::Encoding`] if the bytes are not UTF-8.
pub fn decode_output(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| XgpError::Encoding(format!("engine output is not UTF-8: {e}")))
}
