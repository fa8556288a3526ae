//! Feature matrices with optional targets and sample weights.

use crate::error::{Result, XgpError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::Deserialize;
use std::path::Path;

/// A feature matrix (`rows × features`) with optional targets and weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f64>,
    y: Option<Array1<f64>>,
    sample_weight: Option<Array1<f64>>,
}

#[derive(Debug, Deserialize)]
struct DatasetDoc {
    x: Vec<Vec<f64>>,
    #[serde(default)]
    y: Option<Vec<f64>>,
    #[serde(default)]
    sample_weight: Option<Vec<f64>>,
}

impl Dataset {
    /// Build a dataset, checking that targets and weights have one entry per row.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::InvalidData`] on a length mismatch.
    pub fn new(
        x: Array2<f64>,
        y: Option<Array1<f64>>,
        sample_weight: Option<Array1<f64>>,
    ) -> Result<Self> {
        let rows = x.nrows();
        for (name, v) in [("y", &y), ("sample_weight", &sample_weight)] {
            if let Some(v) = v
                && v.len() != rows
            {
                return Err(XgpError::InvalidData(format!(
                    "{name} has {} entries but x has {rows} rows",
                    v.len()
                )));
            }
        }
        Ok(Self {
            x,
            y,
            sample_weight,
        })
    }

    /// Features only, for prediction.
    #[must_use]
    pub fn features(x: Array2<f64>) -> Self {
        Self {
            x,
            y: None,
            sample_weight: None,
        }
    }

    /// Read `{"x": [[...]], "y": [...], "sample_weight": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::Io`] if the file cannot be read,
    /// [`XgpError::Persist`] if it is not a dataset document and
    /// [`XgpError::InvalidData`] for ragged rows or length mismatches.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a dataset document.
    ///
    /// # Errors
    ///
    /// See [`Dataset::from_json_file`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: DatasetDoc = serde_json::from_str(text)
            .map_err(|e| XgpError::Persist(format!("invalid dataset document: {e}")))?;
        let x = rows_to_matrix(doc.x)?;
        Self::new(
            x,
            doc.y.map(Array1::from_vec),
            doc.sample_weight.map(Array1::from_vec),
        )
    }

    /// Feature matrix.
    #[must_use]
    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    /// Targets, if present.
    #[must_use]
    pub fn y(&self) -> Option<ArrayView1<'_, f64>> {
        self.y.as_ref().map(|v| v.view())
    }

    /// Targets, which fitting requires.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::InvalidData`] if the dataset has no targets.
    pub fn targets(&self) -> Result<ArrayView1<'_, f64>> {
        self.y()
            .ok_or_else(|| XgpError::InvalidData("dataset has no targets".into()))
    }

    /// Sample weights, if present.
    #[must_use]
    pub fn sample_weight(&self) -> Option<ArrayView1<'_, f64>> {
        self.sample_weight.as_ref().map(|v| v.view())
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

fn rows_to_matrix(rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for (i, row) in rows.into_iter().enumerate() {
        if row.len() != n_cols {
            return Err(XgpError::InvalidData(format!(
                "row {i} has {} values, expected {n_cols}",
                row.len()
            )));
        }
        flat.extend(row);
    }
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| XgpError::InvalidData(e.to_string()))
}
