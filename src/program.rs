//! Program representation returned by the XGP engine.
//!
//! A program is a strict tree of variables, constants and operator
//! applications. It can be read from the engine's text output
//! ([`parse_text`]) or from its JSON output ([`parse_json`]), and it is
//! evaluated over a batch of rows at once.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use xgp::program::parse_text;
//!
//! let program = parse_text("add(X[0], 3.5)").unwrap();
//! let x = array![[1.0, 2.0], [4.0, 5.0]];
//! assert_eq!(program.evaluate(x.view()).unwrap(), array![4.5, 7.5]);
//! ```

mod ensemble;
mod eval;
mod json;
mod ops;
mod text;

pub use ensemble::Ensemble;
pub use json::parse_json;
pub use ops::{ALL_OPS, Op, OpFn, protected_div};
pub use text::parse_text;

use crate::error::{Result, XgpError};
use std::fmt;

/// Deepest operator nesting the parsers accept.
///
/// Parsing, evaluation and printing all recurse once per level.
pub const MAX_DEPTH: usize = 128;

/// A node of a program tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Selects a column of the input matrix.
    Variable(usize),
    /// A literal broadcast to every row.
    Constant(f64),
    /// An operator applied to its operands, left to right.
    ///
    /// Build with [`Node::operator`] so the operand count is checked.
    Operator {
        /// The operator.
        op: Op,
        /// Operands; exactly `op.arity()` of them.
        operands: Vec<Node>,
    },
}

impl Node {
    /// Build an operator node, checking the operand count.
    ///
    /// # Errors
    ///
    /// Returns [`XgpError::ArityMismatch`] if `operands.len() != op.arity()`.
    pub fn operator(op: Op, operands: Vec<Node>) -> Result<Self> {
        if operands.len() != op.arity() {
            return Err(XgpError::ArityMismatch {
                op: op.name(),
                expected: op.arity(),
                got: operands.len(),
            });
        }
        Ok(Self::Operator { op, operands })
    }

    /// Count the number of nodes in this tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Variable(_) | Self::Constant(_) => 1,
            Self::Operator { operands, .. } => {
                1 + operands.iter().map(Node::node_count).sum::<usize>()
            }
        }
    }

    /// Height of the tree; a single leaf has height 0.
    #[must_use]
    pub fn height(&self) -> usize {
        match self {
            Self::Variable(_) | Self::Constant(_) => 0,
            Self::Operator { operands, .. } => {
                1 + operands.iter().map(Node::height).max().unwrap_or(0)
            }
        }
    }

    /// Largest column index referenced, if any variable appears.
    #[must_use]
    pub fn max_variable_index(&self) -> Option<usize> {
        match self {
            Self::Variable(i) => Some(*i),
            Self::Constant(_) => None,
            Self::Operator { operands, .. } => {
                operands.iter().filter_map(Node::max_variable_index).max()
            }
        }
    }
}

/// Canonical text form, readable by [`parse_text`].
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(i) => write!(f, "X[{i}]"),
            Self::Constant(v) => write!(f, "{v}"),
            Self::Operator { op, operands } => {
                write!(f, "{op}(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        // add(X[0], mul(X[3], cos(2)))
        Node::operator(
            Op::Add,
            vec![
                Node::Variable(0),
                Node::operator(
                    Op::Mul,
                    vec![
                        Node::Variable(3),
                        Node::operator(Op::Cos, vec![Node::Constant(2.0)]).unwrap(),
                    ],
                )
                .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_operator_arity_checked() {
        let err = Node::operator(Op::Cos, vec![Node::Constant(1.0), Node::Constant(2.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            XgpError::ArityMismatch { op: "cos", expected: 1, got: 2 }
        ));
        assert!(Node::operator(Op::Max, vec![Node::Variable(0)]).is_err());
    }

    #[test]
    fn test_node_count_and_height() {
        let node = sample();
        assert_eq!(node.node_count(), 6);
        assert_eq!(node.height(), 3);
        assert_eq!(Node::Constant(1.0).height(), 0);
    }

    #[test]
    fn test_max_variable_index() {
        assert_eq!(sample().max_variable_index(), Some(3));
        assert_eq!(Node::Constant(1.0).max_variable_index(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(sample().to_string(), "add(X[0], mul(X[3], cos(2)))");
        assert_eq!(Node::Constant(-0.25).to_string(), "-0.25");
    }
}
