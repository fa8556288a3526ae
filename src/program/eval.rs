//! Vectorized evaluation of program trees.

use crate::error::{Result, XgpError};
use crate::program::Node;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

impl Node {
    /// Evaluate the program over every row of `x` (shape `rows × columns`).
    ///
    /// Returns one value per row. Operands are evaluated left to right.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::IndexOutOfRange`] if a variable references a
    /// column `x` does not have.
    pub fn evaluate(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        match self {
            Self::Variable(i) => {
                if *i >= x.ncols() {
                    return Err(XgpError::IndexOutOfRange {
                        index: *i,
                        columns: x.ncols(),
                    });
                }
                Ok(x.index_axis(Axis(1), *i).to_owned())
            }
            Self::Constant(v) => Ok(Array1::from_elem(x.nrows(), *v)),
            Self::Operator { op, operands } => {
                let values = operands
                    .iter()
                    .map(|operand| operand.evaluate(x))
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<ArrayView1<'_, f64>> = values.iter().map(|v| v.view()).collect();
                op.apply(&views)
            }
        }
    }
}
