//! Marshaling of arrays and strings into the engine's ABI records.
//!
//! The engine is a Go library exported through cgo, so its arguments are
//! Go string and slice headers:
//!
//! ```text
//! GoString         { p: *const c_char,         n: i64 }
//! GoFloat64Slice   { data: *const f64,         len: i64, cap: i64 }
//! GoFloat64Matrix  { data: *const GoFloat64Slice, len: i64, cap: i64 }
//! ```
//!
//! The `Marshaled*` types own the buffers the headers point into. A header
//! is only valid while its owner is alive and unmodified, which the owner
//! guarantees by never handing out mutable access.
//!
//! Matrices are transposed: a `rows × cols` matrix becomes `cols` slices
//! of `rows` values each, one per feature. The engine reads features
//! column-wise and silently produces garbage if given rows instead.

use crate::error::{Result, XgpError};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewD, Axis, Ix1, Ix2};
use std::ffi::{OsStr, c_char};

/// Version of the record layouts below.
pub const ABI_VERSION: u32 = 1;

/// Go string header. No NUL terminator is expected or appended.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GoString {
    p: *const c_char,
    n: i64,
}

/// Go `[]float64` header. `cap` always equals `len`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GoFloat64Slice {
    data: *const f64,
    len: i64,
    cap: i64,
}

/// Go `[][]float64` header.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GoFloat64Matrix {
    data: *const GoFloat64Slice,
    len: i64,
    cap: i64,
}

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(size_of::<GoString>() == 16);
    assert!(size_of::<GoFloat64Slice>() == 24);
    assert!(size_of::<GoFloat64Matrix>() == 24);
    assert!(align_of::<GoString>() == 8);
    assert!(align_of::<GoFloat64Slice>() == 8);
    assert!(align_of::<GoFloat64Matrix>() == 8);
};

fn abi_len(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn host_len(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

impl GoString {
    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        host_len(self.n)
    }

    /// Whether the string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n <= 0
    }

    /// View the referenced bytes.
    ///
    /// # Safety
    ///
    /// The buffer the header was built from must still be alive and
    /// unmodified for `'a`.
    #[must_use]
    pub unsafe fn as_bytes<'a>(&self) -> &'a [u8] {
        if self.is_empty() || self.p.is_null() {
            return &[];
        }
        // SAFETY: the caller guarantees the buffer is live; `n` is its length.
        unsafe { std::slice::from_raw_parts(self.p.cast::<u8>(), self.len()) }
    }
}

impl GoFloat64Slice {
    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        host_len(self.len)
    }

    /// Capacity reported to the engine.
    #[must_use]
    pub fn capacity(&self) -> usize {
        host_len(self.cap)
    }

    /// Whether the slice is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len <= 0
    }

    /// View the referenced values.
    ///
    /// # Safety
    ///
    /// The buffer the header was built from must still be alive and
    /// unmodified for `'a`.
    #[must_use]
    pub unsafe fn as_slice<'a>(&self) -> &'a [f64] {
        if self.is_empty() || self.data.is_null() {
            return &[];
        }
        // SAFETY: the caller guarantees the buffer is live; `len` is its length.
        unsafe { std::slice::from_raw_parts(self.data, self.len()) }
    }
}

impl GoFloat64Matrix {
    /// Number of slices (features).
    #[must_use]
    pub fn len(&self) -> usize {
        host_len(self.len)
    }

    /// Capacity reported to the engine.
    #[must_use]
    pub fn capacity(&self) -> usize {
        host_len(self.cap)
    }

    /// Whether the matrix holds no slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len <= 0
    }

    /// View the slice headers.
    ///
    /// # Safety
    ///
    /// The header array the matrix was built from must still be alive and
    /// unmodified for `'a`.
    #[must_use]
    pub unsafe fn slices<'a>(&self) -> &'a [GoFloat64Slice] {
        if self.is_empty() || self.data.is_null() {
            return &[];
        }
        // SAFETY: the caller guarantees the header array is live.
        unsafe { std::slice::from_raw_parts(self.data, self.len()) }
    }
}

/// Owned, marshaled string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarshaledString {
    bytes: Vec<u8>,
}

impl MarshaledString {
    /// Marshal a string. Embedded NUL bytes are kept.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self {
            bytes: s.as_bytes().to_vec(),
        }
    }

    /// Marshal raw bytes, which must be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::Encoding`] if the bytes are not valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| XgpError::Encoding(format!("string argument is not UTF-8: {e}")))?;
        Ok(Self::new(s))
    }

    /// Marshal an OS string, which must be representable as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::Encoding`] if the string is not valid UTF-8.
    pub fn from_os_str(s: &OsStr) -> Result<Self> {
        s.to_str().map(Self::new).ok_or_else(|| {
            XgpError::Encoding(format!("string argument {s:?} is not UTF-8"))
        })
    }

    /// The marshaled bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Header for the native call; valid while `self` is alive.
    #[must_use]
    pub fn header(&self) -> GoString {
        GoString {
            p: self.bytes.as_ptr().cast::<c_char>(),
            n: abi_len(self.bytes.len()),
        }
    }
}

/// Owned, marshaled `[]float64`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarshaledSlice {
    values: Vec<f64>,
}

impl MarshaledSlice {
    /// Marshal a vector.
    #[must_use]
    pub fn new(values: ArrayView1<'_, f64>) -> Self {
        Self {
            values: values.to_vec(),
        }
    }

    /// A zero-length slice, used for absent optional inputs.
    #[must_use]
    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// Marshal an optional vector; `None` becomes a zero-length slice.
    #[must_use]
    pub fn optional(values: Option<ArrayView1<'_, f64>>) -> Self {
        values.map_or_else(Self::empty, Self::new)
    }

    /// The marshaled values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Header for the native call; valid while `self` is alive.
    #[must_use]
    pub fn header(&self) -> GoFloat64Slice {
        slice_header(&self.values)
    }
}

fn slice_header(values: &[f64]) -> GoFloat64Slice {
    let len = abi_len(values.len());
    GoFloat64Slice {
        data: values.as_ptr(),
        len,
        cap: len,
    }
}

/// Owned, marshaled `[][]float64`, stored column-major.
#[derive(Debug)]
pub struct MarshaledMatrix {
    rows: usize,
    // Inner buffers never move once built; `headers` points into them.
    columns: Vec<Vec<f64>>,
    headers: Vec<GoFloat64Slice>,
}

impl MarshaledMatrix {
    /// Marshal a row-major `rows × cols` matrix as `cols` column buffers.
    #[must_use]
    pub fn new(x: ArrayView2<'_, f64>) -> Self {
        let columns: Vec<Vec<f64>> = x.axis_iter(Axis(1)).map(|c| c.to_vec()).collect();
        let headers = columns.iter().map(|c| slice_header(c)).collect();
        Self {
            rows: x.nrows(),
            columns,
            headers,
        }
    }

    /// A zero-shape matrix, used for an absent validation set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rows: 0,
            columns: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Marshal an optional matrix; `None` becomes a zero-shape matrix.
    #[must_use]
    pub fn optional(x: Option<ArrayView2<'_, f64>>) -> Self {
        x.map_or_else(Self::empty, Self::new)
    }

    /// Shape of the original matrix, `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    /// Header for the native call; valid while `self` is alive.
    #[must_use]
    pub fn header(&self) -> GoFloat64Matrix {
        let len = abi_len(self.headers.len());
        GoFloat64Matrix {
            data: self.headers.as_ptr(),
            len,
            cap: len,
        }
    }

    /// Rebuild the original row-major matrix by reading through the header.
    #[must_use]
    pub fn to_array(&self) -> Array2<f64> {
        let header = self.header();
        let mut out = Array2::zeros((self.rows, header.len()));
        // SAFETY: the header and every slice it references point into
        // buffers owned by `self`, which is borrowed for this whole call.
        let slices = unsafe { header.slices() };
        for (j, slice) in slices.iter().enumerate() {
            // SAFETY: as above.
            let values = unsafe { slice.as_slice() };
            for (i, v) in values.iter().enumerate() {
                out[[i, j]] = *v;
            }
        }
        out
    }
}

/// A marshaled array of either supported dimensionality.
#[derive(Debug)]
pub enum Marshaled {
    /// One-dimensional input.
    Slice(MarshaledSlice),
    /// Two-dimensional input.
    Matrix(MarshaledMatrix),
}

/// Marshal an array of dynamic dimensionality.
///
/// # Errors
///
/// Returns [`XgpError::Shape`] unless the array has 1 or 2 dimensions.
pub fn marshal_array(x: ArrayViewD<'_, f64>) -> Result<Marshaled> {
    let ndim = x.ndim();
    match ndim {
        1 => x
            .into_dimensionality::<Ix1>()
            .map(|v| Marshaled::Slice(MarshaledSlice::new(v)))
            .map_err(|_| XgpError::Shape { ndim }),
        2 => x
            .into_dimensionality::<Ix2>()
            .map(|m| Marshaled::Matrix(MarshaledMatrix::new(m)))
            .map_err(|_| XgpError::Shape { ndim }),
        _ => Err(XgpError::Shape { ndim }),
    }
}
