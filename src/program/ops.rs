//! Operator table.
//!
//! Every operator is a pure elementwise function over one or two
//! equal-length vectors.

use crate::error::{Result, XgpError};
use ndarray::{Array1, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

/// Operators a program may apply.
///
/// `max` and `min` sit next to the unary functions in the engine's
/// function list but are elementwise maximum/minimum of two vectors, so
/// they are registered with arity 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Cosine.
    Cos,
    /// Sine.
    Sin,
    /// Natural logarithm.
    Log,
    /// Exponential.
    Exp,
    /// Elementwise maximum.
    Max,
    /// Elementwise minimum.
    Min,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Protected division: a zero denominator yields `1.0`.
    Div,
    /// Power.
    Pow,
}

/// Every operator, in table order.
pub const ALL_OPS: [Op; 11] = [
    Op::Cos,
    Op::Sin,
    Op::Log,
    Op::Exp,
    Op::Max,
    Op::Min,
    Op::Add,
    Op::Sub,
    Op::Mul,
    Op::Div,
    Op::Pow,
];

/// Scalar kernel behind an operator.
#[derive(Debug, Clone, Copy)]
pub enum OpFn {
    /// One operand.
    Unary(fn(f64) -> f64),
    /// Two operands.
    Binary(fn(f64, f64) -> f64),
}

impl Op {
    /// Look an operator up by name.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::UnknownOperator`] if the name is not registered.
    pub fn from_name(name: &str) -> Result<Self> {
        ALL_OPS
            .iter()
            .copied()
            .find(|op| op.name() == name)
            .ok_or_else(|| XgpError::UnknownOperator(name.to_string()))
    }

    /// Name used in text and JSON programs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cos => "cos",
            Self::Sin => "sin",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Max => "max",
            Self::Min => "min",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Pow => "pow",
        }
    }

    /// Number of operands.
    #[must_use]
    pub fn arity(self) -> usize {
        match self.function() {
            OpFn::Unary(_) => 1,
            OpFn::Binary(_) => 2,
        }
    }

    /// The scalar kernel.
    #[must_use]
    pub fn function(self) -> OpFn {
        match self {
            Self::Cos => OpFn::Unary(f64::cos),
            Self::Sin => OpFn::Unary(f64::sin),
            Self::Log => OpFn::Unary(f64::ln),
            Self::Exp => OpFn::Unary(f64::exp),
            Self::Max => OpFn::Binary(f64::max),
            Self::Min => OpFn::Binary(f64::min),
            Self::Add => OpFn::Binary(add),
            Self::Sub => OpFn::Binary(sub),
            Self::Mul => OpFn::Binary(mul),
            Self::Div => OpFn::Binary(protected_div),
            Self::Pow => OpFn::Binary(f64::powf),
        }
    }

    /// Apply the operator elementwise.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::ArityMismatch`] if `operands.len()` differs from
    /// the arity, and [`XgpError::InvalidData`] if the operands differ in
    /// length.
    pub fn apply(self, operands: &[ArrayView1<'_, f64>]) -> Result<Array1<f64>> {
        match (self.function(), operands) {
            (OpFn::Unary(f), [a]) => Ok(a.mapv(f)),
            (OpFn::Binary(f), [a, b]) => {
                if a.len() != b.len() {
                    return Err(XgpError::InvalidData(format!(
                        "`{}` operands have lengths {} and {}",
                        self.name(),
                        a.len(),
                        b.len()
                    )));
                }
                Ok(Zip::from(a).and(b).map_collect(|&x, &y| f(x, y)))
            }
            _ => Err(XgpError::ArityMismatch {
                op: self.name(),
                expected: self.arity(),
                got: operands.len(),
            }),
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Op {
    type Err = XgpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

fn add(a: f64, b: f64) -> f64 {
    a + b
}

fn sub(a: f64, b: f64) -> f64 {
    a - b
}

fn mul(a: f64, b: f64) -> f64 {
    a * b
}

/// Division that returns exactly `1.0` when the denominator is zero.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn protected_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_lookup_every_name() {
        for op in ALL_OPS {
            assert_eq!(Op::from_name(op.name()).unwrap(), op);
        }
        assert!(matches!(
            Op::from_name("tan"),
            Err(XgpError::UnknownOperator(name)) if name == "tan"
        ));
    }

    #[test]
    fn test_arity() {
        assert_eq!(Op::Cos.arity(), 1);
        assert_eq!(Op::Log.arity(), 1);
        assert_eq!(Op::Max.arity(), 2);
        assert_eq!(Op::Min.arity(), 2);
        assert_eq!(Op::Pow.arity(), 2);
    }

    #[test]
    fn test_protected_div_zero() {
        assert_eq!(protected_div(5.0, 0.0), 1.0);
        assert_eq!(protected_div(0.0, 0.0), 1.0);
        assert_eq!(protected_div(-3.0, -0.0), 1.0);
        assert_eq!(protected_div(f64::INFINITY, 0.0), 1.0);
        assert_eq!(protected_div(6.0, 3.0), 2.0);
    }

    #[test]
    fn test_apply_binary() {
        let a = array![1.0, 5.0, -2.0];
        let b = array![3.0, 0.0, 4.0];
        let out = Op::Max.apply(&[a.view(), b.view()]).unwrap();
        assert_eq!(out, array![3.0, 5.0, 4.0]);
        let out = Op::Div.apply(&[a.view(), b.view()]).unwrap();
        assert_eq!(out, array![1.0 / 3.0, 1.0, -0.5]);
    }

    #[test]
    fn test_apply_arity_mismatch() {
        let a = array![1.0];
        let err = Op::Add.apply(&[a.view()]).unwrap_err();
        assert!(matches!(
            err,
            XgpError::ArityMismatch { op: "add", expected: 2, got: 1 }
        ));
    }

    #[test]
    fn test_apply_length_mismatch() {
        let a = array![1.0, 2.0];
        let b = array![1.0];
        assert!(Op::Sub.apply(&[a.view(), b.view()]).is_err());
    }
}
